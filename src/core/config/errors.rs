//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Upper bound for intra- and inter-op thread pools.
pub const MAX_THREADS: usize = 256;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An ONNX model file is missing.
    #[error("model file not found: {path}")]
    ModelPathNotFound { path: std::path::PathBuf },

    /// A stage threshold or setting is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A thread or size setting exceeds what the host can reasonably give.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// Range checks shared by every stage configuration.
///
/// Implementors only write [`ConfigValidator::validate`]; a bad threshold is
/// then rejected before the first image is touched.
pub trait ConfigValidator {
    fn validate(&self) -> Result<(), ConfigError>;

    /// The documented default profile.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// The path must name an existing regular file.
    fn validate_model_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ModelPathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::InvalidConfig {
                message: format!("model path {} is a directory", path.display()),
            });
        }
        Ok(())
    }

    /// Validates a ratio lies in `[0.0, 1.0]`.
    fn validate_ratio(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        self.validate_f64_range(value, 0.0, 1.0, field_name)
    }

    /// ONNX Runtime thread pools: at least one, at most [`MAX_THREADS`].
    fn validate_thread_count(&self, threads: usize) -> Result<(), ConfigError> {
        match threads {
            0 => Err(ConfigError::InvalidConfig {
                message: "thread count must be at least 1".to_string(),
            }),
            n if n > MAX_THREADS => Err(ConfigError::ResourceLimitExceeded {
                message: format!("{} threads requested, limit is {}", n, MAX_THREADS),
            }),
            _ => Ok(()),
        }
    }

    /// `value` must be finite and within `[min, max]`.
    fn validate_f64_range(
        &self,
        value: f64,
        min: f64,
        max: f64,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if !value.is_finite() || value < min || value > max {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Sizes and counts that must be non-zero.
    fn validate_positive_u32(&self, value: u32, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }
}
