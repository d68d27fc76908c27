use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::GenerationError;
use crate::llm::media::{
    detect_mime_type, encode_data_uri, normalize_image_mime_type, parse_data_uri, DataUri,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    UserUpload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    data_uri: String,
    origin: ImageOrigin,
}

impl ReferenceImage {
    pub fn from_data_uri(data_uri: impl Into<String>) -> Self {
        ReferenceImage {
            data_uri: data_uri.into(),
            origin: ImageOrigin::UserUpload,
        }
    }

    /// Encodes raw file bytes, rejecting anything the image decoder cannot read.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReferenceError> {
        if bytes.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let format =
            image::guess_format(bytes).map_err(|err| ReferenceError::Undecodable(err.to_string()))?;
        image::load_from_memory_with_format(bytes, format)
            .map_err(|err| ReferenceError::Undecodable(err.to_string()))?;

        let mime_type = detect_mime_type(bytes)
            .filter(|mime| mime.starts_with("image/"))
            .map(|mime| normalize_image_mime_type(&mime))
            .unwrap_or_else(|| format.to_mime_type().to_string());

        Ok(Self::from_data_uri(encode_data_uri(&mime_type, bytes)))
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn origin(&self) -> ImageOrigin {
        self.origin
    }

    pub fn decompose(&self) -> Result<DataUri<'_>, GenerationError> {
        parse_data_uri(&self.data_uri).ok_or_else(|| {
            GenerationError::MalformedReference(
                "expected data:<mime>;base64,<payload>".to_string(),
            )
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Reference file is empty")]
    Empty,
    #[error("Reference file is not a decodable image: {0}")]
    Undecodable(String),
    #[error("Reference decode task failed: {0}")]
    DecodeTask(String),
}

/// Runs the image decode on the blocking pool.
pub async fn decode_reference(bytes: Vec<u8>) -> Result<ReferenceImage, ReferenceError> {
    tokio::task::spawn_blocking(move || ReferenceImage::from_bytes(&bytes))
        .await
        .map_err(|err| ReferenceError::DecodeTask(err.to_string()))?
}

/// Identifies one read; only the most recently issued ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket(u64);

#[derive(Debug, Default)]
struct HolderState {
    image: Option<ReferenceImage>,
    selected_path: Option<PathBuf>,
    latest_ticket: u64,
}

#[derive(Debug, Default)]
pub struct ReferenceImageHolder {
    state: Mutex<HolderState>,
}

impl ReferenceImageHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_read(&self) -> ReadTicket {
        let mut state = self.state.lock();
        state.latest_ticket += 1;
        ReadTicket(state.latest_ticket)
    }

    /// Stores `image` if no newer read or clear happened since `ticket` was issued.
    pub fn commit(
        &self,
        ticket: ReadTicket,
        image: ReferenceImage,
        path: Option<PathBuf>,
    ) -> bool {
        let mut state = self.state.lock();
        if ticket.0 != state.latest_ticket {
            debug!(
                "Dropping superseded reference read (ticket={}, latest={})",
                ticket.0, state.latest_ticket
            );
            return false;
        }
        state.image = Some(image);
        state.selected_path = path;
        true
    }

    /// Reads and encodes `path`. `None` is a no-op.
    ///
    /// Returns `Ok(true)` when this read became the held image and `Ok(false)`
    /// when there was nothing to read or a later selection won.
    pub async fn set_image(&self, path: Option<&Path>) -> Result<bool, ReferenceError> {
        let Some(path) = path else {
            return Ok(false);
        };

        let ticket = self.begin_read();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ReferenceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let byte_len = bytes.len();
        let image = decode_reference(bytes).await?;
        let committed = self.commit(ticket, image, Some(path.to_path_buf()));
        if committed {
            info!(
                "Loaded reference image {} ({} bytes)",
                path.display(),
                byte_len
            );
        }
        Ok(committed)
    }

    /// Drops the held image and the remembered selection so the same file can be picked again.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.latest_ticket += 1;
        state.image = None;
        state.selected_path = None;
    }

    pub fn image(&self) -> Option<ReferenceImage> {
        self.state.lock().image.clone()
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        self.state.lock().selected_path.clone()
    }

    pub fn has_image(&self) -> bool {
        self.state.lock().image.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub(crate) fn png_bytes() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 120, 40, 255]));
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    pub(crate) fn write_temp_png(name: &str) -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "nano-figure-tests-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, png_bytes()).unwrap();
        path
    }

    #[test]
    fn encodes_png_as_data_uri() {
        let image = ReferenceImage::from_bytes(&png_bytes()).unwrap();
        assert!(image.data_uri().starts_with("data:image/png;base64,"));
        assert_eq!(image.origin(), ImageOrigin::UserUpload);
        assert_eq!(image.decompose().unwrap().mime_type, "image/png");
    }

    #[test]
    fn rejects_bytes_that_are_not_images() {
        assert!(matches!(
            ReferenceImage::from_bytes(b"plain text, not an image"),
            Err(ReferenceError::Undecodable(_))
        ));
        assert!(matches!(
            ReferenceImage::from_bytes(&[]),
            Err(ReferenceError::Empty)
        ));
    }

    #[test]
    fn malformed_data_uri_fails_decomposition() {
        let image = ReferenceImage::from_data_uri("not-a-data-uri");
        assert!(matches!(
            image.decompose(),
            Err(GenerationError::MalformedReference(_))
        ));
    }

    #[test]
    fn later_read_wins_over_earlier_completion() {
        let holder = ReferenceImageHolder::new();
        let first = holder.begin_read();
        let second = holder.begin_read();

        let newer = ReferenceImage::from_data_uri("data:image/png;base64,BBBB");
        let older = ReferenceImage::from_data_uri("data:image/png;base64,AAAA");
        assert!(holder.commit(second, newer.clone(), None));
        assert!(!holder.commit(first, older, None));
        assert_eq!(holder.image(), Some(newer));
    }

    #[test]
    fn clear_discards_image_and_pending_reads() {
        let holder = ReferenceImageHolder::new();
        let pending = holder.begin_read();
        holder.clear();
        let image = ReferenceImage::from_data_uri("data:image/png;base64,AAAA");
        assert!(!holder.commit(pending, image, None));
        assert!(!holder.has_image());
        assert!(holder.selected_path().is_none());
    }

    #[tokio::test]
    async fn decode_runs_off_the_runtime_thread() {
        let image = decode_reference(png_bytes()).await.unwrap();
        assert!(image.data_uri().starts_with("data:image/png;base64,"));
        assert!(matches!(
            decode_reference(b"not an image".to_vec()).await,
            Err(ReferenceError::Undecodable(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn newer_selection_commits_while_older_read_is_decoding() {
        let holder = ReferenceImageHolder::new();
        let older = holder.begin_read();
        let pending = tokio::spawn(decode_reference(png_bytes()));

        let newer_path = write_temp_png("holder-newer.png");
        assert!(holder.set_image(Some(newer_path.as_path())).await.unwrap());

        let stale = pending.await.unwrap().unwrap();
        assert!(!holder.commit(older, stale, None));
        assert_eq!(holder.selected_path(), Some(newer_path));
    }

    #[tokio::test]
    async fn set_image_without_file_is_a_no_op() {
        let holder = ReferenceImageHolder::new();
        assert!(!holder.set_image(None).await.unwrap());
        assert!(!holder.has_image());
    }

    #[tokio::test]
    async fn set_image_reads_file_and_clear_allows_reselect() {
        let path = write_temp_png("holder-reselect.png");
        let holder = ReferenceImageHolder::new();

        assert!(holder.set_image(Some(path.as_path())).await.unwrap());
        assert_eq!(holder.selected_path(), Some(path.clone()));

        holder.clear();
        assert!(!holder.has_image());

        assert!(holder.set_image(Some(path.as_path())).await.unwrap());
        assert!(holder.has_image());
    }

    #[tokio::test]
    async fn missing_file_reports_io_error() {
        let holder = ReferenceImageHolder::new();
        let path = std::env::temp_dir().join("nano-figure-definitely-missing.png");
        let result = holder.set_image(Some(path.as_path())).await;
        assert!(matches!(result, Err(ReferenceError::Io { .. })));
        assert!(!holder.has_image());
    }
}
