//! Working-scale handling around the oracle call.
//!
//! Oracle cost grows with pixel count, so large photographs can be shrunk
//! before segmentation. The selected mask is then brought back to the
//! original grid with nearest-neighbour sampling so it stays strictly binary.

use std::borrow::Cow;

use image::{RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::Mask;

/// Optional cap on the longest image side seen by the oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    /// `None` keeps the original resolution.
    pub max_side: Option<u32>,
}

impl ConfigValidator for ScalingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_side) = self.max_side {
            self.validate_positive_u32(max_side, "scaling.max_side")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// The mapping between an original image and its working copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingScale {
    /// Original dimensions `(width, height)`.
    pub original: (u32, u32),
    /// Working dimensions `(width, height)`.
    pub working: (u32, u32),
    /// `s = min(1, max_side / max(H, W))`.
    pub factor: f64,
}

impl WorkingScale {
    pub fn is_identity(&self) -> bool {
        self.original == self.working
    }
}

/// Downscales images for the oracle and restores masks to full resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionNormalizer {
    config: ScalingConfig,
}

impl ResolutionNormalizer {
    pub fn new(config: ScalingConfig) -> Self {
        Self { config }
    }

    /// Computes the working scale for a `width` x `height` image.
    pub fn scale_for(&self, width: u32, height: u32) -> WorkingScale {
        let longest = width.max(height);
        let factor = match self.config.max_side {
            Some(max_side) if longest > 0 => (max_side as f64 / longest as f64).min(1.0),
            _ => 1.0,
        };
        let working = if factor < 1.0 {
            (
                ((width as f64 * factor).round() as u32).max(1),
                ((height as f64 * factor).round() as u32).max(1),
            )
        } else {
            (width, height)
        };
        WorkingScale {
            original: (width, height),
            working,
            factor,
        }
    }

    /// Returns the image the oracle should see, borrowing when no resize is needed.
    pub fn downscale<'a>(&self, image: &'a RgbImage) -> (Cow<'a, RgbImage>, WorkingScale) {
        let scale = self.scale_for(image.width(), image.height());
        if scale.is_identity() {
            return (Cow::Borrowed(image), scale);
        }
        debug!(
            "Downscaling {}x{} -> {}x{} (factor {:.4})",
            scale.original.0, scale.original.1, scale.working.0, scale.working.1, scale.factor
        );
        let resized = image::imageops::resize(
            image,
            scale.working.0,
            scale.working.1,
            FilterType::Triangle,
        );
        (Cow::Owned(resized), scale)
    }

    /// Maps a working-resolution mask back onto the original grid.
    pub fn restore(&self, mask: &Mask, scale: &WorkingScale) -> Mask {
        let (width, height) = scale.original;
        mask.resize_nearest(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cap_keeps_original_size() {
        let normalizer = ResolutionNormalizer::default();
        let scale = normalizer.scale_for(4000, 3000);
        assert!(scale.is_identity());
        assert_eq!(scale.factor, 1.0);
    }

    #[test]
    fn cap_never_upscales() {
        let normalizer = ResolutionNormalizer::new(ScalingConfig {
            max_side: Some(2048),
        });
        let scale = normalizer.scale_for(800, 600);
        assert!(scale.is_identity());
    }

    #[test]
    fn cap_shrinks_longest_side() {
        let normalizer = ResolutionNormalizer::new(ScalingConfig {
            max_side: Some(1000),
        });
        let scale = normalizer.scale_for(2000, 1000);
        assert_eq!(scale.working, (1000, 500));
        assert!((scale.factor - 0.5).abs() < 1e-12);
    }

    #[test]
    fn downscale_borrows_when_identity() {
        let normalizer = ResolutionNormalizer::default();
        let image = RgbImage::new(8, 8);
        let (working, _) = normalizer.downscale(&image);
        assert!(matches!(working, Cow::Borrowed(_)));
    }

    #[test]
    fn restore_keeps_mask_binary_and_aligned() {
        let normalizer = ResolutionNormalizer::new(ScalingConfig { max_side: Some(4) });
        let image = RgbImage::new(8, 6);
        let (working, scale) = normalizer.downscale(&image);
        assert_eq!(working.dimensions(), (4, 3));

        // Left half foreground at working scale.
        let small = Mask::from_fn(4, 3, |x, _| x < 2);
        let restored = normalizer.restore(&small, &scale);
        assert_eq!(restored.dimensions(), (8, 6));
        assert_eq!(restored, Mask::from_fn(8, 6, |x, _| x < 4));
    }

    #[test]
    fn zero_max_side_is_rejected() {
        let config = ScalingConfig { max_side: Some(0) };
        assert!(config.validate().is_err());
    }
}
