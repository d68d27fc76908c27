use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

static DATA_URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(.+);base64,(.+)$").expect("data URI pattern is valid")
});

/// The two halves of a `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

impl DataUri<'_> {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(self.payload)
    }
}

pub fn parse_data_uri(value: &str) -> Option<DataUri<'_>> {
    let captures = DATA_URI_PATTERN.captures(value)?;
    let mime_type = captures.get(1)?.as_str();
    let payload = captures.get(2)?.as_str();
    Some(DataUri { mime_type, payload })
}

pub fn to_data_uri(mime_type: &str, payload: &str) -> String {
    let mime_type = if mime_type.trim().is_empty() {
        DEFAULT_IMAGE_MIME
    } else {
        mime_type.trim()
    };
    format!("data:{mime_type};base64,{payload}")
}

pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    to_data_uri(mime_type, &general_purpose::STANDARD.encode(bytes))
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}
