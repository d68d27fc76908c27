use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::prompt::build_request;
use super::reference::{ReferenceError, ReferenceImageHolder};
use super::{GenerationError, GenerationOptions, ImageGenerator};
use crate::llm::media::parse_data_uri;

const INTERRUPTED_MESSAGE: &str = "Generation was interrupted before a result arrived.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Snapshot of what the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub phase: Phase,
    pub is_in_flight: bool,
    pub last_error: Option<String>,
    pub last_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed(GenerationError),
    /// Another submission is still outstanding; nothing was changed.
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Stored image is not a base64 data URI")]
    MalformedImage,
    #[error("Stored image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
struct StudioState {
    phase: Phase,
    last_error: Option<GenerationError>,
    last_image: Option<String>,
}

impl StudioState {
    fn fail(&mut self, error: GenerationError) {
        self.phase = Phase::Failed;
        self.last_error = Some(error);
        self.last_image = None;
    }
}

/// Owns the submit → result lifecycle for one user session.
pub struct FigureStudio {
    generator: Arc<dyn ImageGenerator>,
    reference: ReferenceImageHolder,
    state: Mutex<StudioState>,
}

impl FigureStudio {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        FigureStudio {
            generator,
            reference: ReferenceImageHolder::new(),
            state: Mutex::new(StudioState::default()),
        }
    }

    pub fn reference(&self) -> &ReferenceImageHolder {
        &self.reference
    }

    pub fn state(&self) -> UiState {
        let state = self.state.lock();
        UiState {
            phase: state.phase,
            is_in_flight: state.phase == Phase::Submitting,
            last_error: state.last_error.as_ref().map(GenerationError::user_message),
            last_image: state.last_image.clone(),
        }
    }

    /// Loads a reference file. A successful load clears a pending
    /// missing-reference error.
    pub async fn select_reference(&self, path: Option<&Path>) -> Result<bool, ReferenceError> {
        let committed = self.reference.set_image(path).await?;
        if committed {
            let mut state = self.state.lock();
            if state.last_error == Some(GenerationError::MissingReference) {
                state.last_error = None;
                state.phase = Phase::Idle;
            }
        }
        Ok(committed)
    }

    pub fn clear_reference(&self) {
        self.reference.clear();
    }

    pub async fn submit(&self, options: &GenerationOptions) -> SubmitOutcome {
        let request = {
            let mut state = self.state.lock();
            if state.phase == Phase::Submitting {
                warn!("Ignoring submit while a generation is already in flight");
                return SubmitOutcome::Busy;
            }

            let Some(reference) = self.reference.image() else {
                state.fail(GenerationError::MissingReference);
                return SubmitOutcome::Failed(GenerationError::MissingReference);
            };

            state.phase = Phase::Submitting;
            state.last_error = None;
            state.last_image = None;
            build_request(options, reference)
        };

        info!(
            "Submitting figure generation (aspect_ratio={}, prompt_chars={})",
            request.aspect_ratio,
            request.prompt.chars().count()
        );

        let mut guard = InFlightGuard {
            studio: self,
            armed: true,
        };
        let result = self.generator.generate(&request).await;
        guard.armed = false;
        drop(request);

        let mut state = self.state.lock();
        match result {
            Ok(image) => {
                info!("Figure generation succeeded ({} chars)", image.len());
                state.phase = Phase::Succeeded;
                state.last_error = None;
                state.last_image = Some(image);
                SubmitOutcome::Succeeded
            }
            Err(err) => {
                warn!("Figure generation failed: {}", err);
                state.fail(err.clone());
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Saves the generated image into `out_dir`. Returns `None` when there is
    /// nothing to save.
    pub async fn download(&self, out_dir: &Path) -> Result<Option<PathBuf>, DownloadError> {
        let image = {
            let state = self.state.lock();
            if state.phase != Phase::Succeeded {
                return Ok(None);
            }
            match state.last_image.clone() {
                Some(image) => image,
                None => return Ok(None),
            }
        };

        let parsed = parse_data_uri(&image).ok_or(DownloadError::MalformedImage)?;
        let bytes = parsed.decode()?;
        let path = out_dir.join(download_file_name(Utc::now().timestamp_millis()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;

        info!("Saved generated figure to {}", path.display());
        Ok(Some(path))
    }
}

pub fn download_file_name(unix_millis: i64) -> String {
    format!("nano-figure-{unix_millis}.png")
}

/// Leaves the studio in `Failed` if a submit future is dropped mid-call.
struct InFlightGuard<'a> {
    studio: &'a FigureStudio,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.studio
                .state
                .lock()
                .fail(GenerationError::Transport(INTERRUPTED_MESSAGE.to_string()));
        }
    }
}
