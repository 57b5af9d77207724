//! Batch statistics.
//!
//! [`BatchStats`] counts how many images were written and why the others
//! were left out, and renders a short summary at the end of a run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::SkipReason;

/// Outcome counts for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Images written to the output directory.
    pub processed: usize,
    /// Images excluded from the output, with the reason.
    pub skipped: Vec<(PathBuf, SkipReason)>,
    /// Summed per-image wall time of processed images.
    pub processing_time: Duration,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&mut self, elapsed: Duration) {
        self.processed += 1;
        self.processing_time += elapsed;
    }

    pub fn record_skipped(&mut self, path: PathBuf, reason: SkipReason) {
        self.skipped.push((path, reason));
    }

    pub fn total(&self) -> usize {
        self.processed + self.skipped.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Skip counts keyed by [`SkipReason::label`].
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in &self.skipped {
            *counts.entry(reason.label()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total() as f64) * 100.0
        }
    }

    /// Mean processing time of processed images in milliseconds.
    pub fn average_time_ms(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.processing_time.as_secs_f64() * 1000.0 / self.processed as f64
        }
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Statistics:")?;
        writeln!(f, "  Total images: {}", self.total())?;
        writeln!(
            f,
            "  Processed: {} ({:.1}%)",
            self.processed,
            self.success_rate()
        )?;
        writeln!(f, "  Skipped: {}", self.skipped_count())?;
        for (label, count) in self.skip_counts() {
            writeln!(f, "    {}: {}", label, count)?;
        }
        writeln!(f, "  Average time per image: {:.2} ms", self.average_time_ms())?;
        writeln!(f, "  Elapsed: {:.2} s", self.elapsed.as_secs_f64())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_rates() {
        let mut stats = BatchStats::new();
        stats.record_processed(Duration::from_millis(100));
        stats.record_processed(Duration::from_millis(300));
        stats.record_skipped("a.jpg".into(), SkipReason::NoCandidates);
        stats.record_skipped("b.jpg".into(), SkipReason::NoCandidates);
        stats.record_skipped("c.png".into(), SkipReason::EmptyFinalMask);

        assert_eq!(stats.total(), 5);
        assert_eq!(stats.skipped_count(), 3);
        assert!((stats.success_rate() - 40.0).abs() < 1e-9);
        assert!((stats.average_time_ms() - 200.0).abs() < 1e-9);
        assert_eq!(stats.skip_counts()["no_candidates"], 2);
        assert_eq!(stats.skip_counts()["empty_final_mask"], 1);
    }

    #[test]
    fn empty_batch_renders() {
        let stats = BatchStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        let text = stats.to_string();
        assert!(text.contains("Total images: 0"));
    }
}
