//! Error types for the matting pipeline.
//!
//! This module defines the hard errors that can occur while preparing a batch
//! (configuration, model loading, inference, I/O) together with the
//! recoverable per-image [`SkipReason`] used to exclude a single image from
//! the output without aborting the batch.

use std::fmt;
use thiserror::Error;

/// Enum representing different stages of the per-image pipeline.
///
/// This enum is used to identify which stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Candidate selection over the oracle output.
    Selection,
    /// Working-scale downscaling or mask upsampling.
    Resize,
    /// Edge-anchored component removal.
    GeometryFilter,
    /// Rotated second pass and mask intersection.
    Consensus,
    /// Background island reclassification.
    HoleFill,
    /// Closing and opening of the mask boundary.
    Smoothing,
    /// Cropping, whitening and letterboxing.
    Composition,
    /// Oracle pre- or post-processing.
    Segmentation,
    /// Generic processing error.
    Generic,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::Selection => write!(f, "candidate selection"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::GeometryFilter => write!(f, "geometry filter"),
            ProcessingStage::Consensus => write!(f, "orientation consensus"),
            ProcessingStage::HoleFill => write!(f, "hole filling"),
            ProcessingStage::Smoothing => write!(f, "smoothing"),
            ProcessingStage::Composition => write!(f, "composition"),
            ProcessingStage::Segmentation => write!(f, "segmentation"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the matting pipeline.
#[derive(Error, Debug)]
pub enum MatteError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred while encoding or writing an output image.
    #[error("image save: {path}")]
    ImageSave {
        /// Destination path of the failed write.
        path: String,
        /// The underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference on model '{model_name}': {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error while loading a model file.
    #[error("failed to load model '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the model file.
        model_path: String,
        /// Short reason description.
        reason: String,
        /// Optional suggestion, already formatted.
        suggestion: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<crate::core::config::ConfigError> for MatteError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// A plain message error used as the source of wrapped errors.
#[derive(Debug, Clone)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SimpleError {}

/// Why an image was excluded from the output.
///
/// None of these abort the batch; the runner logs a warning and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The file could not be decoded as an image.
    UnreadableImage(String),
    /// The oracle proposed no candidate regions.
    NoCandidates,
    /// The oracle call itself failed.
    OracleFailure(String),
    /// The refined mask has no foreground pixels.
    EmptyFinalMask,
    /// The padded bounding box has zero area.
    DegenerateCrop,
    /// The composed canvas could not be written.
    WriteFailure(String),
    /// A stage hit an unexpected fault unrelated to the oracle.
    PipelineFailure(String),
}

impl SkipReason {
    /// Short stable label used for aggregation in batch statistics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::UnreadableImage(_) => "unreadable_image",
            SkipReason::NoCandidates => "no_candidates",
            SkipReason::OracleFailure(_) => "oracle_failure",
            SkipReason::EmptyFinalMask => "empty_final_mask",
            SkipReason::DegenerateCrop => "degenerate_crop",
            SkipReason::WriteFailure(_) => "write_failure",
            SkipReason::PipelineFailure(_) => "pipeline_failure",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnreadableImage(detail) => write!(f, "unreadable image ({detail})"),
            SkipReason::NoCandidates => write!(f, "oracle returned no candidates"),
            SkipReason::OracleFailure(detail) => write!(f, "oracle failed ({detail})"),
            SkipReason::EmptyFinalMask => write!(f, "final mask is empty"),
            SkipReason::DegenerateCrop => write!(f, "bounding box crop is degenerate"),
            SkipReason::WriteFailure(detail) => write!(f, "could not write output ({detail})"),
            SkipReason::PipelineFailure(detail) => write!(f, "pipeline fault ({detail})"),
        }
    }
}
