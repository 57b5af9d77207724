//! ONNX Runtime configuration types.
//!
//! The oracle owns its sessions; this module only describes how they are
//! built and which compute device they run on.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::{ConfigError, ConfigValidator};

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Compute device an inference session is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceDevice {
    /// CPU execution provider (always available).
    #[default]
    Cpu,
    /// NVIDIA CUDA execution provider on the given device ordinal.
    Cuda(i32),
}

impl FromStr for InferenceDevice {
    type Err = ConfigError;

    /// Parses `cpu`, `cuda`, `gpu` or `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse::<i32>().ok())
                .filter(|ordinal| *ordinal >= 0)
                .map(Self::Cuda)
                .ok_or_else(|| ConfigError::InvalidConfig {
                    message: format!("unknown device '{s}', expected cpu, cuda or cuda:N"),
                }),
        }
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Device the sessions are bound to
    pub device: InferenceDevice,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Binds the sessions to `device`.
    pub fn with_device(mut self, device: InferenceDevice) -> Self {
        self.device = device;
        self
    }
}

impl ConfigValidator for OrtSessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.intra_threads {
            self.validate_thread_count(threads)?;
        }
        if let Some(threads) = self.inter_threads {
            self.validate_thread_count(threads)?;
        }
        if cfg!(not(feature = "cuda")) && matches!(self.device, InferenceDevice::Cuda(_)) {
            return Err(ConfigError::InvalidConfig {
                message: "CUDA support not enabled. Compile with --features cuda".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_strings() {
        assert_eq!("cpu".parse::<InferenceDevice>().unwrap(), InferenceDevice::Cpu);
        assert_eq!("CUDA".parse::<InferenceDevice>().unwrap(), InferenceDevice::Cuda(0));
        assert_eq!(
            "cuda:2".parse::<InferenceDevice>().unwrap(),
            InferenceDevice::Cuda(2)
        );
        assert!("cuda:x".parse::<InferenceDevice>().is_err());
        assert!("tpu".parse::<InferenceDevice>().is_err());
    }

    #[test]
    fn device_display_round_trips() {
        let device = InferenceDevice::Cuda(1);
        assert_eq!(device.to_string().parse::<InferenceDevice>().unwrap(), device);
    }

    #[test]
    fn session_config_builder() {
        let config = OrtSessionConfig::new()
            .with_intra_threads(4)
            .with_inter_threads(2)
            .with_optimization_level(OrtGraphOptimizationLevel::Level3);
        assert_eq!(config.intra_threads, Some(4));
        assert_eq!(config.inter_threads, Some(2));
        assert_eq!(config.optimization_level, Some(OrtGraphOptimizationLevel::Level3));
        assert_eq!(config.device, InferenceDevice::Cpu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_threads_rejected() {
        assert!(OrtSessionConfig::new().with_intra_threads(0).validate().is_err());
    }
}
