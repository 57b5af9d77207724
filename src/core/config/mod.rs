//! Configuration management for the matting pipeline.
//!
//! This module provides the validation trait shared by every stage
//! configuration and the ONNX Runtime session settings.

pub mod errors;
pub mod onnx;

pub use errors::{ConfigError, ConfigValidator};
pub use onnx::{InferenceDevice, OrtGraphOptimizationLevel, OrtSessionConfig};
