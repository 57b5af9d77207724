//! Post-consensus refinement stages and the per-image trace.

use std::time::Duration;

use crate::domain::{BoundingBox, Mask};
use crate::processors::{GeometryFilter, HoleFiller, MorphologicalSmoother};

/// How the orientation consensus step ended for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConsensusStatus {
    /// Disabled in the configuration.
    #[default]
    NotRun,
    /// Both views were intersected; a blank intersection ends in a skip.
    Agreed { rejected: u64 },
    /// The rotated pass was missing; the single-view mask was kept.
    Degraded { reason: String },
}

/// What happened to one image on its way through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTrace {
    /// Candidates proposed for the upright image.
    pub candidate_count: usize,
    pub selected_index: Option<usize>,
    pub band_score: u64,
    /// No candidate reached the band and the largest one was taken.
    pub selection_fell_back: bool,
    /// Working-scale factor used for the primary oracle call.
    pub working_scale: f64,
    pub components_removed: usize,
    /// Every component looked like a surface and the filter kept its input.
    pub filter_reverted: bool,
    pub consensus: ConsensusStatus,
    pub islands_filled: usize,
    pub smoothing_radius: Option<u8>,
    pub crop: Option<BoundingBox>,
    /// Wall-clock time per stage, in execution order.
    pub timings: Vec<(&'static str, Duration)>,
}

impl StageTrace {
    pub fn record_timing(&mut self, stage: &'static str, elapsed: Duration) {
        self.timings.push((stage, elapsed));
    }

    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|(_, d)| *d).sum()
    }
}

/// A named mask-to-mask transform.
pub trait MaskRefiner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transforms `mask`, noting what it did on `trace`.
    fn refine(&self, mask: Mask, trace: &mut StageTrace) -> Mask;
}

impl MaskRefiner for GeometryFilter {
    fn name(&self) -> &'static str {
        "geometry_filter"
    }

    fn refine(&self, mask: Mask, trace: &mut StageTrace) -> Mask {
        let (filtered, report) = self.apply(&mask);
        if !report.reverted {
            trace.components_removed += report.removed.len();
        }
        trace.filter_reverted |= report.reverted;
        filtered
    }
}

impl MaskRefiner for HoleFiller {
    fn name(&self) -> &'static str {
        "hole_fill"
    }

    fn refine(&self, mask: Mask, trace: &mut StageTrace) -> Mask {
        let (filled, report) = self.apply(&mask);
        trace.islands_filled = report.islands_filled;
        filled
    }
}

impl MaskRefiner for MorphologicalSmoother {
    fn name(&self) -> &'static str {
        "smoothing"
    }

    fn refine(&self, mask: Mask, trace: &mut StageTrace) -> Mask {
        let (smoothed, radius) = self.apply(&mask);
        trace.smoothing_radius = Some(radius);
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::HoleFillConfig;

    #[test]
    fn refiners_report_on_trace() {
        let mut trace = StageTrace::default();
        let mut mask = Mask::from_fn(30, 30, |x, y| (5..25).contains(&x) && (5..25).contains(&y));
        mask.set(15, 15, false);

        let filler = HoleFiller::new(HoleFillConfig::default());
        let filled = filler.refine(mask, &mut trace);
        assert_eq!(trace.islands_filled, 1);
        assert!(filled.get(15, 15));

        let smoothed = MorphologicalSmoother::default().refine(filled, &mut trace);
        assert_eq!(trace.smoothing_radius, Some(3));
        assert!(smoothed.get(15, 15));
    }

    #[test]
    fn reverted_filter_removes_nothing() {
        let mut trace = StageTrace::default();
        let floor = Mask::from_fn(40, 40, |_, y| y >= 38);
        let out = GeometryFilter::default().refine(floor.clone(), &mut trace);
        assert_eq!(out, floor);
        assert!(trace.filter_reverted);
        assert_eq!(trace.components_removed, 0);
    }

    #[test]
    fn timings_accumulate() {
        let mut trace = StageTrace::default();
        trace.record_timing("a", Duration::from_millis(3));
        trace.record_timing("b", Duration::from_millis(4));
        assert_eq!(trace.total_time(), Duration::from_millis(7));
    }
}
