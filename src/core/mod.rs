//! The core module of the matting pipeline.
//!
//! This module contains the pieces every other module leans on:
//! - Configuration validation and ONNX Runtime settings
//! - Error handling
//! - ONNX Runtime session construction
//! - The segmentation oracle trait
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{ConfigError, ConfigValidator, InferenceDevice, OrtSessionConfig};
pub use errors::{MatteError, MatteResult, ProcessingStage, SkipReason};
pub use inference::load_session;
pub use traits::{OracleSampling, SegmentationOracle};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`], but uses `default_directive` when `RUST_LOG` is unset.
pub fn init_tracing_with_default(default_directive: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
