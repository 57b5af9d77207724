//! Pipeline configuration and file loading.
//!
//! A [`PipelineConfig`] bundles the oracle sampling profile with one section
//! per refinement stage. Every field has a default, so a config file only
//! needs to name what it overrides. Both TOML and JSON files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::errors::MatteError;
use crate::core::traits::OracleSampling;
use crate::processors::{
    CompositionConfig, ConsensusConfig, GeometryFilterConfig, HoleFillConfig, ScalingConfig,
    SelectionConfig, SmoothingConfig,
};

/// Complete configuration of the per-image pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sampling for the primary, upright oracle pass.
    pub oracle: OracleSampling,
    pub selection: SelectionConfig,
    pub scaling: ScalingConfig,
    pub geometry: GeometryFilterConfig,
    pub consensus: ConsensusConfig,
    pub hole_fill: HoleFillConfig,
    pub smoothing: SmoothingConfig,
    pub composition: CompositionConfig,
}

impl PipelineConfig {
    /// Loads a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, MatteError> {
        let content = read_config(path)?;
        ConfigLoader::load_from_json(&content)
    }

    /// Loads a config file, picking the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, MatteError> {
        ConfigLoader::load_from_file(path)
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.oracle.validate()?;
        self.selection.validate()?;
        self.scaling.validate()?;
        self.geometry.validate()?;
        self.consensus.validate()?;
        self.hole_fill.validate()?;
        self.smoothing.validate()?;
        self.composition.validate()?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads and writes [`PipelineConfig`] files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use subject_matte::pipeline::ConfigLoader;
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::load_from_file(Path::new("matte.toml"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_file(path: &Path) -> Result<PipelineConfig, MatteError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            MatteError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;
        let content = read_config(path)?;
        Self::load_from_string(&content, format)
    }

    pub fn load_from_string(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineConfig, MatteError> {
        match format {
            ConfigFormat::Toml => Self::load_from_toml(content),
            ConfigFormat::Json => Self::load_from_json(content),
        }
    }

    pub fn load_from_toml(content: &str) -> Result<PipelineConfig, MatteError> {
        toml::from_str(content)
            .map_err(|e| MatteError::config_error(format!("Failed to parse TOML config: {e}")))
    }

    pub fn load_from_json(content: &str) -> Result<PipelineConfig, MatteError> {
        serde_json::from_str(content)
            .map_err(|e| MatteError::config_error(format!("Failed to parse JSON config: {e}")))
    }

    /// Save configuration to a file, auto-detecting the format from the extension
    pub fn save_to_file(config: &PipelineConfig, path: &Path) -> Result<(), MatteError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            MatteError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;
        let content = Self::save_to_string(config, format)?;
        std::fs::write(path, content).map_err(|e| {
            MatteError::config_error(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save_to_string(config: &PipelineConfig, format: ConfigFormat) -> Result<String, MatteError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
                MatteError::config_error(format!("Failed to serialize config to TOML: {e}"))
            }),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                MatteError::config_error(format!("Failed to serialize config to JSON: {e}"))
            }),
        }
    }
}

fn read_config(path: &Path) -> Result<String, MatteError> {
    std::fs::read_to_string(path).map_err(|e| {
        MatteError::config_error(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::CompositionMode;

    #[test]
    fn defaults_are_valid_and_documented_values() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection.band_start, 0.30);
        assert_eq!(config.geometry.floor_max_height, 0.20);
        assert_eq!(config.hole_fill.percentile, 5.0);
        assert_eq!(config.composition.target_size, 768);
        assert_eq!(config.consensus.sampling.points_per_side, 16);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let json = r#"{
            "composition": { "target_size": 512, "mode": "centroid" },
            "consensus": { "enabled": false }
        }"#;
        let config = ConfigLoader::load_from_json(json).unwrap();
        assert_eq!(config.composition.target_size, 512);
        assert_eq!(config.composition.mode, CompositionMode::CentroidCrop);
        assert_eq!(config.composition.padding, 20);
        assert!(!config.consensus.enabled);
        assert!(config.geometry.enabled);
    }

    #[test]
    fn toml_and_json_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.scaling.max_side = Some(2048);
        config.smoothing.enabled = false;

        for name in ["matte.toml", "matte.json"] {
            let path = dir.path().join(name);
            ConfigLoader::save_to_file(&config, &path).unwrap();
            assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
        }
        let json = dir.path().join("matte.json");
        assert_eq!(PipelineConfig::from_json_file(&json).unwrap(), config);
    }

    #[test]
    fn unknown_extension_and_bad_content_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("matte.yaml");
        std::fs::write(&yaml, "a: 1").unwrap();
        assert!(matches!(
            PipelineConfig::from_file(&yaml),
            Err(MatteError::ConfigError { .. })
        ));
        assert!(matches!(
            ConfigLoader::load_from_json("{ not json"),
            Err(MatteError::ConfigError { .. })
        ));
    }

    #[test]
    fn validation_reaches_nested_sections() {
        let mut config = PipelineConfig::default();
        config.selection.band_start = 0.95;
        assert!(config.validate().is_err());
    }
}
