//! The segmentation oracle contract.
//!
//! The refinement engine never looks inside the model: it only hands an
//! image plus a sampling profile to a [`SegmentationOracle`] and receives a
//! set of [`Candidate`] regions back.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::errors::MatteResult;
use crate::domain::Candidate;

/// Sampling knobs forwarded to the oracle on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSampling {
    /// Prompt points per image side; the grid holds `points_per_side²` prompts.
    pub points_per_side: u32,
    /// Minimum predicted mask quality.
    pub pred_iou_thresh: f32,
    /// Minimum mask stability under logit threshold jitter.
    pub stability_score_thresh: f32,
    /// Masks smaller than this many pixels are never returned.
    pub min_region_area: u64,
    /// Box IoU above which the lower-quality of two overlapping proposals is dropped.
    pub box_nms_thresh: f32,
}

impl OracleSampling {
    /// A sparser grid for second-opinion passes.
    pub fn coarse() -> Self {
        Self {
            points_per_side: 16,
            ..Self::default()
        }
    }

    pub fn with_points_per_side(mut self, points_per_side: u32) -> Self {
        self.points_per_side = points_per_side;
        self
    }
}

impl Default for OracleSampling {
    fn default() -> Self {
        Self {
            points_per_side: 32,
            pred_iou_thresh: 0.9,
            stability_score_thresh: 0.95,
            min_region_area: 4096,
            box_nms_thresh: 0.7,
        }
    }
}

impl ConfigValidator for OracleSampling {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_u32(self.points_per_side, "points_per_side")?;
        self.validate_ratio(self.pred_iou_thresh as f64, "pred_iou_thresh")?;
        self.validate_ratio(self.stability_score_thresh as f64, "stability_score_thresh")?;
        self.validate_ratio(self.box_nms_thresh as f64, "box_nms_thresh")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// A promptless segmenter proposing candidate foreground regions.
///
/// Implementations may cache internally but must not otherwise change state
/// between calls; one handle is shared read-only across a whole batch.
pub trait SegmentationOracle: Send + Sync {
    /// Human-readable name used in log lines.
    fn name(&self) -> &str;

    /// Proposes candidate regions for `image`.
    ///
    /// Every returned mask has the dimensions of `image`. An empty vector is a
    /// valid answer and means "nothing found".
    fn generate(&self, image: &RgbImage, sampling: &OracleSampling)
    -> MatteResult<Vec<Candidate>>;
}
