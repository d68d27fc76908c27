pub mod prompt;
pub mod reference;
pub mod studio;

use async_trait::async_trait;

use crate::catalog::{self, AspectRatio, BASE_OPTIONS, SCALE_OPTIONS, STYLE_OPTIONS};

pub use reference::ReferenceImage;
pub use studio::{FigureStudio, SubmitOutcome};

pub const MISSING_REFERENCE_MESSAGE: &str = "Please upload a reference image first.";
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred, please retry.";
pub const NO_CANDIDATES_MESSAGE: &str = "No candidates returned from the model.";
pub const NO_CONTENT_MESSAGE: &str = "No content parts returned.";
pub const NO_IMAGE_DATA_MESSAGE: &str = "No image data found in the response.";
pub const REMOTE_FALLBACK_MESSAGE: &str = "Failed to generate image.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub scale: String,
    pub style: String,
    pub base: String,
    pub aspect_ratio: AspectRatio,
    pub free_text: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            scale: catalog::default_value(SCALE_OPTIONS).to_string(),
            style: catalog::default_value(STYLE_OPTIONS).to_string(),
            base: catalog::default_value(BASE_OPTIONS).to_string(),
            aspect_ratio: AspectRatio::default(),
            free_text: String::new(),
        }
    }
}

/// A single outbound call, built fresh for every submission.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference: ReferenceImage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Please upload a reference image first.")]
    MissingReference,
    #[error("Invalid reference image data: {0}")]
    MalformedReference(String),
    #[error("{0}")]
    EmptyResult(String),
    #[error("{0}")]
    Transport(String),
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,
}

impl GenerationError {
    /// Text stored as the last error for display.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// The remote image generation capability.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated image as a data URI.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_falls_back_for_blank_errors() {
        assert_eq!(
            GenerationError::Transport(String::new()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            GenerationError::Transport("quota exceeded".to_string()).user_message(),
            "quota exceeded"
        );
        assert_eq!(
            GenerationError::MissingReference.user_message(),
            MISSING_REFERENCE_MESSAGE
        );
    }

    #[test]
    fn default_options_use_catalog_heads() {
        let options = GenerationOptions::default();
        assert_eq!(options.scale, "1/7 scale");
        assert_eq!(options.style, "realistic style");
        assert_eq!(options.aspect_ratio, AspectRatio::Landscape);
        assert!(options.free_text.is_empty());
    }
}
