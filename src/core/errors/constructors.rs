//! Error constructor utilities for the matting pipeline.
//!
//! These helpers keep call sites short when wrapping foreign errors with the
//! stage and model context that the log lines need.
//!
//! ```rust
//! use subject_matte::core::errors::{MatteError, ProcessingStage};
//!
//! let error = MatteError::processing(
//!     ProcessingStage::Composition,
//!     "letterbox resize",
//!     std::io::Error::new(std::io::ErrorKind::InvalidData, "zero sized crop"),
//! );
//! assert!(error.to_string().starts_with("composition failed"));
//! ```

use super::types::{MatteError, ProcessingStage};

impl MatteError {
    /// Wraps `error` as a failure of the given pipeline stage.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError`.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an inference error for the named model.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for model load failures with an optional suggestion.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an error for a failed output write.
    pub fn image_save(path: impl AsRef<std::path::Path>, source: image::ImageError) -> Self {
        Self::ImageSave {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
