//! Candidate selection by vertical band coverage.
//!
//! A centred subject's body almost always crosses the middle-to-lower part of
//! the frame while ceilings and floors sit outside it, so candidates are
//! ranked by how many of their pixels fall inside a horizontal band of rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::{Candidate, Mask};

/// Band bounds as fractions of the image height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// First band row, as a fraction of height (inclusive).
    pub band_start: f64,
    /// Last band row, as a fraction of height (exclusive).
    pub band_end: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            band_start: 0.30,
            band_end: 0.90,
        }
    }
}

impl ConfigValidator for SelectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ratio(self.band_start, "selection.band_start")?;
        self.validate_ratio(self.band_end, "selection.band_end")?;
        if self.band_start >= self.band_end {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "selection band is empty: start {} >= end {}",
                    self.band_start, self.band_end
                ),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Which candidate won and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Index into the candidate slice.
    pub index: usize,
    /// Foreground pixels of the winner inside the band.
    pub band_score: u64,
    /// True when no candidate touched the band and the largest area won.
    pub fell_back_to_area: bool,
}

/// Picks the single best candidate out of an oracle proposal set.
///
/// Ties go to the first maximal candidate in the order the oracle returned
/// them, so a fixed candidate ordering always yields the same winner.
#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    config: SelectionConfig,
}

impl CandidateSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Band rows `[start, end)` for an image of `height` rows.
    pub fn band_rows(&self, height: u32) -> (u32, u32) {
        let start = (self.config.band_start * height as f64).floor() as u32;
        let end = (self.config.band_end * height as f64).floor() as u32;
        (start.min(height), end.min(height))
    }

    /// Count of foreground pixels of `mask` inside the band.
    pub fn band_score(&self, mask: &Mask, height: u32) -> u64 {
        let (start, end) = self.band_rows(height);
        mask.count_in_rows(start, end)
    }

    /// Selects a candidate, or `None` when `candidates` is empty.
    pub fn select(&self, candidates: &[Candidate], height: u32) -> Option<Selection> {
        let scores: Vec<u64> = candidates
            .iter()
            .map(|c| self.band_score(c.mask(), height))
            .collect();
        let best = first_max_by_key(&scores, |&s| s)?;

        let selection = if scores[best] > 0 {
            Selection {
                index: best,
                band_score: scores[best],
                fell_back_to_area: false,
            }
        } else {
            let largest = first_max_by_key(candidates, |c| c.area())?;
            Selection {
                index: largest,
                band_score: 0,
                fell_back_to_area: true,
            }
        };

        debug!(
            "Selected candidate {}/{} (band score {}, area fallback: {})",
            selection.index + 1,
            candidates.len(),
            selection.band_score,
            selection.fell_back_to_area
        );
        Some(selection)
    }
}

/// Index of the first element with the maximal key.
fn first_max_by_key<T, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Option<usize> {
    let mut best: Option<(usize, K)> = None;
    for (i, item) in items.iter().enumerate() {
        let k = key(item);
        match &best {
            Some((_, best_key)) if k <= *best_key => {}
            _ => best = Some((i, k)),
        }
    }
    best.map(|(i, _)| i)
}
