//! Boundary smoothing by morphological closing and opening.

use imageproc::distance_transform::Norm;
use imageproc::morphology;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::Mask;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Lower bound on the disk radius in pixels.
    pub min_radius: u32,
    /// Radius as a fraction of the image height.
    pub radius_fraction: f64,
    /// Dilate/erode repetitions for the closing step.
    pub close_iterations: u32,
    /// Erode/dilate repetitions for the opening step.
    pub open_iterations: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_radius: 3,
            radius_fraction: 0.01,
            close_iterations: 2,
            open_iterations: 1,
        }
    }
}

impl ConfigValidator for SmoothingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_u32(self.min_radius, "smoothing.min_radius")?;
        self.validate_ratio(self.radius_fraction, "smoothing.radius_fraction")?;
        self.validate_positive_u32(self.close_iterations, "smoothing.close_iterations")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Closing followed by opening with a resolution-scaled disk.
///
/// Closing bridges hairline gaps along the boundary, opening then removes
/// isolated specks. Both use the Euclidean norm so the structuring element
/// is a disk rather than a square.
#[derive(Debug, Clone, Default)]
pub struct MorphologicalSmoother {
    config: SmoothingConfig,
}

impl MorphologicalSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// `max(min_radius, round(radius_fraction * height))`, capped at 255.
    pub fn radius_for(&self, height: u32) -> u8 {
        let scaled = (self.config.radius_fraction * height as f64).round() as u32;
        scaled.max(self.config.min_radius).min(u8::MAX as u32) as u8
    }

    /// Smooths `mask`, returning the result and the radius used.
    pub fn apply(&self, mask: &Mask) -> (Mask, u8) {
        let radius = self.radius_for(mask.height());
        if mask.is_blank() {
            return (mask.clone(), radius);
        }

        let mut gray = mask.to_gray();
        for _ in 0..self.config.close_iterations {
            gray = morphology::dilate(&gray, Norm::L2, radius);
        }
        for _ in 0..self.config.close_iterations {
            gray = morphology::erode(&gray, Norm::L2, radius);
        }
        for _ in 0..self.config.open_iterations {
            gray = morphology::erode(&gray, Norm::L2, radius);
        }
        for _ in 0..self.config.open_iterations {
            gray = morphology::dilate(&gray, Norm::L2, radius);
        }

        let smoothed = Mask::from_gray(&gray);
        debug!(
            "Smoothed mask with radius {} ({} -> {} px)",
            radius,
            mask.count(),
            smoothed.count()
        );
        (smoothed, radius)
    }
}
