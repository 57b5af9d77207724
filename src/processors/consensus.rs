//! Two-view agreement between the upright and the upside-down image.
//!
//! A backdrop that hangs behind the subject only looks like a floor from one
//! direction. Running selection and filtering a second time on the
//! 180-degree rotated photograph, rotating that mask back and intersecting,
//! keeps only the pixels both views call foreground.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::errors::{MatteError, MatteResult, ProcessingStage};
use crate::core::traits::OracleSampling;
use crate::domain::Mask;

/// Settings for the rotated second pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub enabled: bool,
    /// Oracle sampling for the rotated pass; sparser than the primary by default.
    pub sampling: OracleSampling,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sampling: OracleSampling::coarse(),
        }
    }
}

impl ConfigValidator for ConsensusConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.sampling.validate()
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Intersection of two same-frame masks.
///
/// Symmetric in its arguments: `combine(a, b) == combine(b, a)`.
pub fn combine(a: &Mask, b: &Mask) -> MatteResult<Mask> {
    a.and(b)
        .map_err(|e| MatteError::processing(ProcessingStage::Consensus, "combining views", e))
}

/// How the consensus step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsensusOutcome {
    /// Both views produced a mask and were intersected.
    Agreed {
        mask: Mask,
        /// Primary foreground pixels the rotated view rejected.
        rejected: u64,
    },
    /// The rotated view produced nothing usable; the primary mask is kept.
    Degraded { mask: Mask, reason: String },
}

impl ConsensusOutcome {
    pub fn mask(&self) -> &Mask {
        match self {
            ConsensusOutcome::Agreed { mask, .. } | ConsensusOutcome::Degraded { mask, .. } => {
                mask
            }
        }
    }

    pub fn into_mask(self) -> Mask {
        match self {
            ConsensusOutcome::Agreed { mask, .. } | ConsensusOutcome::Degraded { mask, .. } => {
                mask
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ConsensusOutcome::Degraded { .. })
    }
}

/// Runs the rotated pass and intersects it with the primary mask.
#[derive(Debug, Clone, Default)]
pub struct OrientationConsensus {
    config: ConsensusConfig,
}

impl OrientationConsensus {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn sampling(&self) -> &OracleSampling {
        &self.config.sampling
    }

    /// Combines `primary` with a second opinion computed on the rotated `image`.
    ///
    /// `pass` receives the rotated image and the rotated-pass sampling and
    /// returns a full-resolution mask in the rotated frame, or `None` when
    /// the oracle found nothing. A `None` or an `Err` from `pass` degrades to
    /// `primary`; only a frame mismatch between the two masks is an error.
    pub fn apply<F>(&self, primary: &Mask, image: &RgbImage, pass: F) -> MatteResult<ConsensusOutcome>
    where
        F: FnOnce(&RgbImage, &OracleSampling) -> MatteResult<Option<Mask>>,
    {
        let rotated = image::imageops::rotate180(image);
        let second = match pass(&rotated, &self.config.sampling) {
            Ok(Some(mask)) => mask.rotate180(),
            Ok(None) => {
                debug!("Rotated pass found no candidates; keeping single-view mask");
                return Ok(ConsensusOutcome::Degraded {
                    mask: primary.clone(),
                    reason: "rotated pass returned no candidates".to_string(),
                });
            }
            Err(err) => {
                warn!("Rotated pass failed, keeping single-view mask: {}", err);
                return Ok(ConsensusOutcome::Degraded {
                    mask: primary.clone(),
                    reason: err.to_string(),
                });
            }
        };

        let mask = combine(primary, &second)?;
        let rejected = primary.count() - mask.count();
        debug!("Consensus rejected {} of {} pixels", rejected, primary.count());
        Ok(ConsensusOutcome::Agreed { mask, rejected })
    }
}
