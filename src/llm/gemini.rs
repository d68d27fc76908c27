use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::catalog::AspectRatio;
use crate::config::{GeminiConfig, SafetyProfile};
use crate::figure::{
    GenerationError, GenerationRequest, ImageGenerator, NO_CANDIDATES_MESSAGE, NO_CONTENT_MESSAGE,
    NO_IMAGE_DATA_MESSAGE, REMOTE_FALLBACK_MESSAGE,
};
use crate::llm::media::{to_data_uri, truncate_for_log, DataUri, DEFAULT_IMAGE_MIME};
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

/// Generation client for the Gemini `generateContent` endpoint.
pub struct GeminiImageClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiImageClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        GeminiImageClient { http, config }
    }

    pub fn model(&self) -> &str {
        &self.config.image_model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.image_model
        )
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    async fn call_gemini_api(&self, payload: Value) -> Result<GeminiResponse, GenerationError> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(&payload);
            debug!(target: "llm.gemini", model = self.model(), payload = %payload_summary);
        }

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                GenerationError::Transport(format!("Gemini request failed: {err_text}"))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(match transport_error_from_body(status, &body) {
                GenerationError::Transport(detail) => {
                    GenerationError::Transport(self.redact_api_key(&detail))
                }
                other => other,
            });
        }

        let value = parse_gemini_response(&body)?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = self.model(), response = %response_summary);
        }
        Ok(value)
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let reference = request.reference.decompose()?;
        let payload = build_image_payload(
            &request.prompt,
            request.aspect_ratio,
            &reference,
            self.config.safety,
        );
        let metadata = json!({
            "aspectRatio": request.aspect_ratio.as_str(),
            "promptChars": request.prompt.chars().count(),
            "referenceMimeType": reference.mime_type,
        });

        log_llm_timing(
            "gemini",
            self.model(),
            "generate_figure_image",
            Some(metadata),
            || async {
                let response = self.call_gemini_api(payload).await?;
                extract_image_data_uri(response)
            },
        )
        .await
    }
}

/// Maps a non-2xx reply to the error surfaced to the user.
fn transport_error_from_body(status: StatusCode, body: &str) -> GenerationError {
    let (message, body_summary) = summarize_error_body(body);
    warn!("Gemini API error: status={}, body={}", status, body_summary);
    let detail = match message {
        Some(message) if !message.trim().is_empty() => message,
        Some(_) => REMOTE_FALLBACK_MESSAGE.to_string(),
        None => format!("Gemini request failed with status {status}: {body_summary}"),
    };
    GenerationError::Transport(detail)
}

fn parse_gemini_response(body: &str) -> Result<GeminiResponse, GenerationError> {
    serde_json::from_str(body).map_err(|err| {
        GenerationError::Transport(format!("Failed to parse Gemini response: {err}"))
    })
}

fn build_safety_settings(profile: SafetyProfile) -> Vec<Value> {
    let threshold = profile.threshold();
    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn build_image_payload(
    prompt: &str,
    aspect_ratio: AspectRatio,
    reference: &DataUri<'_>,
    safety: SafetyProfile,
) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": reference.mime_type,
                        "data": reference.payload,
                    }
                },
                { "text": prompt },
            ]
        }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio.as_str() },
        },
        "safetySettings": build_safety_settings(safety),
    })
}

/// Pulls the first inline image out of the first candidate.
fn extract_image_data_uri(response: GeminiResponse) -> Result<String, GenerationError> {
    let Some(candidate) = response.candidates.unwrap_or_default().into_iter().next() else {
        return Err(GenerationError::EmptyResult(NO_CANDIDATES_MESSAGE.to_string()));
    };

    let parts = candidate
        .content
        .and_then(|content| content.parts)
        .ok_or_else(|| GenerationError::EmptyResult(NO_CONTENT_MESSAGE.to_string()))?;

    parts
        .into_iter()
        .find_map(|part| match part {
            GeminiPart::InlineData { inline_data } if !inline_data.data.is_empty() => {
                let mime_type = inline_data
                    .mime_type
                    .filter(|mime| !mime.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
                Some(to_data_uri(&mime_type, &inline_data.data))
            }
            _ => None,
        })
        .ok_or_else(|| GenerationError::EmptyResult(NO_IMAGE_DATA_MESSAGE.to_string()))
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let summarized_contents: Vec<Value> = contents
            .iter()
            .map(|content| {
                let parts = content
                    .get("parts")
                    .and_then(|value| value.as_array())
                    .map(|parts| summarize_gemini_parts(parts))
                    .unwrap_or_default();
                json!({ "parts": parts })
            })
            .collect();
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for part in candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .filter_map(|content| content.parts.as_ref())
        .flatten()
    {
        match part {
            GeminiPart::Text { text } => {
                text_parts += 1;
                if text_preview.is_none() && !text.trim().is_empty() {
                    text_preview = Some(truncate_for_log(text, 200));
                }
            }
            GeminiPart::InlineData { inline_data } => {
                if !inline_data.data.is_empty() {
                    image_parts += 1;
                }
            }
            GeminiPart::Other(_) => {}
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}
