//! Reclassification of small enclosed background islands.
//!
//! Segmenters leave gaps between limbs or on specular highlights. Any
//! background component that is fully enclosed by foreground and smaller
//! than an adaptive threshold is treated as such a gap and filled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::{ComponentSet, Mask};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoleFillConfig {
    pub enabled: bool,
    /// Percentile of foreground component areas used as the island cutoff.
    pub percentile: f64,
    /// Cutoff as a fraction of all pixels when there is no foreground component.
    pub fallback_fraction: f64,
}

impl Default for HoleFillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            percentile: 5.0,
            fallback_fraction: 1e-4,
        }
    }
}

impl ConfigValidator for HoleFillConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_f64_range(self.percentile, 0.0, 100.0, "hole_fill.percentile")?;
        self.validate_ratio(self.fallback_fraction, "hole_fill.fallback_fraction")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoleFillReport {
    /// Areas strictly below this were eligible.
    pub threshold: f64,
    /// Islands reclassified as foreground.
    pub islands_filled: usize,
    pub pixels_filled: u64,
}

/// Linearly interpolated percentile of `values`, `None` when empty.
///
/// Ranks are spaced over `[0, n - 1]`, so the 0th percentile is the minimum
/// and the 100th the maximum.
pub fn percentile(values: &[u64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac)
}

#[derive(Debug, Clone, Default)]
pub struct HoleFiller {
    config: HoleFillConfig,
}

impl HoleFiller {
    pub fn new(config: HoleFillConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Island area cutoff for `mask`.
    pub fn threshold(&self, mask: &Mask) -> f64 {
        let areas = ComponentSet::label(mask).areas();
        percentile(&areas, self.config.percentile)
            .unwrap_or(self.config.fallback_fraction * mask.pixel_count() as f64)
    }

    /// Fills enclosed background islands smaller than [`Self::threshold`].
    ///
    /// Background touching the frame border is never filled.
    pub fn apply(&self, mask: &Mask) -> (Mask, HoleFillReport) {
        let threshold = self.threshold(mask);
        let (width, height) = mask.dimensions();

        let background = ComponentSet::label(&mask.invert());
        let islands: Vec<_> = background
            .components()
            .iter()
            .filter(|c| (c.area as f64) < threshold && !c.touches_border(width, height))
            .collect();

        let report = HoleFillReport {
            threshold,
            islands_filled: islands.len(),
            pixels_filled: islands.iter().map(|c| c.area).sum(),
        };
        if islands.is_empty() {
            debug!("No background islands below {:.1} px", threshold);
            return (mask.clone(), report);
        }

        let mut fill = vec![false; background.max_label() as usize + 1];
        for island in &islands {
            fill[island.label as usize] = true;
        }
        // Background that is not an island stays background.
        let cleaned = background.select(|label| !fill[label as usize]).invert();

        debug!(
            "Filled {} background islands ({} px) below {:.1} px",
            report.islands_filled, report.pixels_filled, threshold
        );
        (cleaned, report)
    }
}
