//! Helpers for building ONNX Runtime sessions.

use crate::core::config::{InferenceDevice, OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::MatteError;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;
use tracing::debug;

/// Loads a session from `model_path`, applying threading, optimisation and
/// device settings from `config`.
pub fn load_session(
    model_path: impl AsRef<Path>,
    config: &OrtSessionConfig,
) -> Result<Session, MatteError> {
    let path = model_path.as_ref();
    let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
    let builder = apply_ort_config(builder, config)?;
    let session = builder.commit_from_file(path).map_err(|e| {
        MatteError::model_load_error(
            path,
            "failed to create ONNX session",
            Some("check device configuration and that the model file is a valid ONNX export"),
            Some(e),
        )
    })?;
    debug!(
        "Loaded ONNX session from {} on {}",
        path.display(),
        config.device
    );
    Ok(session)
}

/// File stem of a model path, used as its display name.
pub fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown_model")
        .to_string()
}

fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(level) = cfg.optimization_level {
        let mapped = match level {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    let providers = execution_providers(cfg.device);
    if !providers.is_empty() {
        builder = builder.with_execution_providers(providers)?;
    }
    Ok(builder)
}

fn execution_providers(device: InferenceDevice) -> Vec<ExecutionProviderDispatch> {
    match device {
        InferenceDevice::Cpu => {
            vec![ort::execution_providers::CPUExecutionProvider::default().build()]
        }
        #[cfg(feature = "cuda")]
        InferenceDevice::Cuda(device_id) => vec![
            ort::execution_providers::CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
        ],
        #[cfg(not(feature = "cuda"))]
        InferenceDevice::Cuda(_) => Vec::new(),
    }
}
