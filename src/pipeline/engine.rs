//! The per-image refinement engine.
//!
//! One call to [`MatteEngine::process`] takes a photograph from oracle
//! proposals to a composed canvas. Stage failures either fall back (empty
//! filter result, missing rotated pass) or end with a [`SkipReason`]; they
//! never leak into other images.

use std::time::Instant;

use image::RgbImage;
use tracing::debug;

use super::config::PipelineConfig;
use super::context::SegmentationContext;
use super::stages::{ConsensusStatus, MaskRefiner, StageTrace};
use crate::core::config::ConfigValidator;
use crate::core::errors::{MatteError, MatteResult, ProcessingStage, SimpleError, SkipReason};
use crate::core::traits::OracleSampling;
use crate::domain::{Candidate, Mask};
use crate::processors::{
    CandidateSelector, CanvasComposer, ComposeError, ConsensusOutcome, GeometryFilter,
    HoleFiller, MorphologicalSmoother, OrientationConsensus, ResolutionNormalizer, Selection,
    WorkingScale,
};

/// A fully processed image.
#[derive(Debug, Clone)]
pub struct MatteOutput {
    /// `target_size` x `target_size` composition.
    pub canvas: RgbImage,
    /// Final full-resolution mask.
    pub mask: Mask,
    pub trace: StageTrace,
}

/// Result of one image: either an output or the reason it was left out.
#[derive(Debug, Clone)]
pub enum ImageOutcome {
    Processed(Box<MatteOutput>),
    Skipped(SkipReason),
}

impl ImageOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, ImageOutcome::Processed(_))
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            ImageOutcome::Skipped(reason) => Some(reason),
            ImageOutcome::Processed(_) => None,
        }
    }
}

/// Selection, restore and geometry filtering for one orientation.
struct Pass {
    mask: Mask,
    selection: Selection,
    candidates: usize,
    scale: WorkingScale,
}

/// Runs the configured stage sequence on single images.
pub struct MatteEngine {
    config: PipelineConfig,
    selector: CandidateSelector,
    normalizer: ResolutionNormalizer,
    geometry: GeometryFilter,
    consensus: OrientationConsensus,
    refiners: Vec<Box<dyn MaskRefiner>>,
    composer: CanvasComposer,
}

impl MatteEngine {
    /// Builds an engine, rejecting invalid configurations up front.
    pub fn new(config: PipelineConfig) -> MatteResult<Self> {
        config.validate()?;

        let mut refiners: Vec<Box<dyn MaskRefiner>> = Vec::new();
        if config.hole_fill.enabled {
            refiners.push(Box::new(HoleFiller::new(config.hole_fill.clone())));
        }
        if config.smoothing.enabled {
            refiners.push(Box::new(MorphologicalSmoother::new(config.smoothing.clone())));
        }

        Ok(Self {
            selector: CandidateSelector::new(config.selection.clone()),
            normalizer: ResolutionNormalizer::new(config.scaling.clone()),
            geometry: GeometryFilter::new(config.geometry.clone()),
            consensus: OrientationConsensus::new(config.consensus.clone()),
            composer: CanvasComposer::new(config.composition.clone()),
            refiners,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the post-consensus stages, in execution order.
    pub fn refiner_names(&self) -> Vec<&'static str> {
        self.refiners.iter().map(|r| r.name()).collect()
    }

    /// Processes one image.
    ///
    /// `Err` is reserved for faults that are not a property of the image,
    /// such as an oracle returning masks of the wrong size.
    pub fn process(
        &self,
        context: &SegmentationContext,
        image: &RgbImage,
    ) -> MatteResult<ImageOutcome> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(MatteError::invalid_input("image has zero area"));
        }
        let mut trace = StageTrace::default();

        let started = Instant::now();
        let (candidates, scale) = match self.propose(context, image, &self.config.oracle) {
            Ok(proposed) => proposed,
            Err(err) => return Ok(ImageOutcome::Skipped(SkipReason::OracleFailure(err.to_string()))),
        };
        trace.record_timing("oracle", started.elapsed());

        let Some(primary) = self.refine_pass(&candidates, scale, Some(&mut trace))? else {
            return Ok(ImageOutcome::Skipped(SkipReason::NoCandidates));
        };
        trace.candidate_count = primary.candidates;
        trace.selected_index = Some(primary.selection.index);
        trace.band_score = primary.selection.band_score;
        trace.selection_fell_back = primary.selection.fell_back_to_area;
        trace.working_scale = primary.scale.factor;

        let mut mask = primary.mask;
        if self.consensus.is_enabled() {
            let started = Instant::now();
            mask = self.run_consensus(context, image, mask, &mut trace)?;
            trace.record_timing("consensus", started.elapsed());
        }

        for refiner in &self.refiners {
            let started = Instant::now();
            mask = refiner.refine(mask, &mut trace);
            trace.record_timing(refiner.name(), started.elapsed());
        }

        if mask.is_blank() {
            return Ok(ImageOutcome::Skipped(SkipReason::EmptyFinalMask));
        }

        let started = Instant::now();
        let composition = match self.composer.compose(image, &mask) {
            Ok(composition) => composition,
            Err(ComposeError::EmptyMask) => {
                return Ok(ImageOutcome::Skipped(SkipReason::EmptyFinalMask));
            }
            Err(ComposeError::DegenerateCrop) => {
                return Ok(ImageOutcome::Skipped(SkipReason::DegenerateCrop));
            }
            Err(err) => {
                return Err(MatteError::processing(
                    ProcessingStage::Composition,
                    "composing canvas",
                    err,
                ));
            }
        };
        trace.crop = Some(composition.crop);
        trace.record_timing("composition", started.elapsed());

        Ok(ImageOutcome::Processed(Box::new(MatteOutput {
            canvas: composition.canvas,
            mask,
            trace,
        })))
    }

    /// Calls the oracle on the working-scale copy of `image`.
    fn propose(
        &self,
        context: &SegmentationContext,
        image: &RgbImage,
        sampling: &OracleSampling,
    ) -> MatteResult<(Vec<Candidate>, WorkingScale)> {
        let (working, scale) = self.normalizer.downscale(image);
        let candidates = context.oracle().generate(&working, sampling)?;
        debug!(
            "{} proposed {} candidates at {}x{}",
            context.oracle().name(),
            candidates.len(),
            scale.working.0,
            scale.working.1
        );
        Ok((candidates, scale))
    }

    /// Selects, restores and filters one orientation; `None` when there are no candidates.
    ///
    /// Stage timings are recorded only when `trace` is given.
    fn refine_pass(
        &self,
        candidates: &[Candidate],
        scale: WorkingScale,
        mut trace: Option<&mut StageTrace>,
    ) -> MatteResult<Option<Pass>> {
        let (_, working_h) = scale.working;
        let started = Instant::now();
        let Some(selection) = self.selector.select(candidates, working_h) else {
            return Ok(None);
        };
        if let Some(trace) = trace.as_deref_mut() {
            trace.record_timing("selection", started.elapsed());
        }
        let selected = candidates[selection.index].mask();
        if selected.dimensions() != scale.working {
            return Err(MatteError::processing(
                ProcessingStage::Selection,
                "oracle candidate does not match the working image",
                SimpleError::new(format!(
                    "candidate is {:?}, working image is {:?}",
                    selected.dimensions(),
                    scale.working
                )),
            ));
        }

        let started = Instant::now();
        let restored = self.normalizer.restore(selected, &scale);
        if let Some(trace) = trace.as_deref_mut() {
            trace.record_timing("resize", started.elapsed());
        }

        if !self.geometry.is_enabled() {
            return Ok(Some(Pass {
                mask: restored,
                selection,
                candidates: candidates.len(),
                scale,
            }));
        }
        let started = Instant::now();
        let mask = match trace {
            Some(trace) => {
                let filtered = self.geometry.refine(restored, trace);
                trace.record_timing(self.geometry.name(), started.elapsed());
                filtered
            }
            None => self.geometry.apply(&restored).0,
        };

        Ok(Some(Pass {
            mask,
            selection,
            candidates: candidates.len(),
            scale,
        }))
    }

    fn run_consensus(
        &self,
        context: &SegmentationContext,
        image: &RgbImage,
        primary: Mask,
        trace: &mut StageTrace,
    ) -> MatteResult<Mask> {
        let outcome = self.consensus.apply(&primary, image, |rotated, sampling| {
            let (candidates, scale) = self.propose(context, rotated, sampling)?;
            Ok(self.refine_pass(&candidates, scale, None)?.map(|pass| pass.mask))
        })?;

        match outcome {
            ConsensusOutcome::Agreed { mask, rejected } => {
                trace.consensus = ConsensusStatus::Agreed { rejected };
                Ok(mask)
            }
            ConsensusOutcome::Degraded { mask, reason } => {
                trace.consensus = ConsensusStatus::Degraded { reason };
                Ok(mask)
            }
        }
    }
}

impl std::fmt::Debug for MatteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatteEngine")
            .field("config", &self.config)
            .field("refiners", &self.refiner_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InferenceDevice;
    use crate::core::traits::SegmentationOracle;

    /// Returns the same rectangles, scaled to whatever image it is given.
    struct RectOracle {
        rects: Vec<(f32, f32, f32, f32)>,
    }

    impl SegmentationOracle for RectOracle {
        fn name(&self) -> &str {
            "rect"
        }

        fn generate(
            &self,
            image: &RgbImage,
            _sampling: &OracleSampling,
        ) -> MatteResult<Vec<Candidate>> {
            let (w, h) = image.dimensions();
            Ok(self
                .rects
                .iter()
                .map(|&(x0, y0, x1, y1)| {
                    Candidate::new(Mask::from_fn(w, h, |x, y| {
                        let (fx, fy) = (x as f32 / w as f32, y as f32 / h as f32);
                        fx >= x0 && fx < x1 && fy >= y0 && fy < y1
                    }))
                })
                .collect())
        }
    }

    fn context(rects: Vec<(f32, f32, f32, f32)>) -> SegmentationContext {
        SegmentationContext::new(Box::new(RectOracle { rects }), InferenceDevice::Cpu)
    }

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.composition.target_size = 64;
        config.composition.padding = 2;
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.composition.target_size = 0;
        assert!(MatteEngine::new(config).is_err());
    }

    #[test]
    fn disabled_stages_are_not_scheduled() {
        let mut config = PipelineConfig::default();
        config.hole_fill.enabled = false;
        let engine = MatteEngine::new(config).unwrap();
        assert_eq!(engine.refiner_names(), vec!["smoothing"]);
    }

    #[test]
    fn symmetric_subject_survives_consensus() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let ctx = context(vec![(0.25, 0.25, 0.75, 0.75)]);
        let image = RgbImage::new(80, 60);
        let outcome = engine.process(&ctx, &image).unwrap();
        let ImageOutcome::Processed(output) = outcome else {
            panic!("expected processed image");
        };
        assert_eq!(output.canvas.dimensions(), (64, 64));
        assert_eq!(output.trace.selected_index, Some(0));
        assert!(matches!(output.trace.consensus, ConsensusStatus::Agreed { .. }));
        assert!(output.mask.get(40, 30));
        assert!(!output.mask.get(2, 2));
    }

    #[test]
    fn no_candidates_is_a_skip() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let outcome = engine.process(&context(vec![]), &RgbImage::new(20, 20)).unwrap();
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::NoCandidates));
    }

    /// One candidate holding a central column plus a floor strip along the bottom edge.
    struct SubjectOnFloorOracle;

    impl SegmentationOracle for SubjectOnFloorOracle {
        fn name(&self) -> &str {
            "subject-on-floor"
        }

        fn generate(
            &self,
            image: &RgbImage,
            _sampling: &OracleSampling,
        ) -> MatteResult<Vec<Candidate>> {
            let (w, h) = image.dimensions();
            let mask = Mask::from_fn(w, h, |x, y| {
                let column = x >= w * 2 / 5 && x < w * 3 / 5 && y >= h / 5 && y < h * 4 / 5;
                let floor = x >= w / 20 && x < w * 19 / 20 && y >= h * 9 / 10;
                column || floor
            });
            Ok(vec![Candidate::new(mask)])
        }
    }

    #[test]
    fn floor_strip_is_removed_and_column_kept() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let ctx = SegmentationContext::new(Box::new(SubjectOnFloorOracle), InferenceDevice::Cpu);
        let outcome = engine.process(&ctx, &RgbImage::new(100, 200)).unwrap();
        let ImageOutcome::Processed(output) = outcome else {
            panic!("expected processed image");
        };
        assert_eq!(output.trace.components_removed, 1);
        assert!(!output.trace.filter_reverted);
        assert!(output.mask.get(50, 100));
        assert!(!output.mask.get(50, 195));
        assert!(!output.mask.get(10, 190));
    }

    #[test]
    fn all_surface_mask_reverts_instead_of_emptying() {
        let engine = MatteEngine::new(small_config()).unwrap();
        // A full-width strip through the middle: a side wall and nothing else.
        // It maps onto itself under a half turn, so both views agree.
        let ctx = context(vec![(0.0, 0.4, 1.0, 0.6)]);
        let outcome = engine.process(&ctx, &RgbImage::new(40, 40)).unwrap();
        let ImageOutcome::Processed(output) = outcome else {
            panic!("expected processed image");
        };
        assert!(output.trace.filter_reverted);
        assert_eq!(output.trace.components_removed, 0);
        assert!(matches!(output.trace.consensus, ConsensusStatus::Agreed { .. }));
        assert!(output.mask.get(20, 20));
        assert_eq!(output.canvas.dimensions(), (64, 64));
    }

    #[test]
    fn disjoint_views_are_skipped_as_empty() {
        let engine = MatteEngine::new(small_config()).unwrap();
        // Upper part of whatever frame the oracle sees; the rotated view lands in the lower part.
        let ctx = context(vec![(0.3, 0.05, 0.7, 0.45)]);
        let outcome = engine.process(&ctx, &RgbImage::new(100, 100)).unwrap();
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::EmptyFinalMask));
    }

    #[test]
    fn timings_name_each_stage_in_order() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let ctx = context(vec![(0.25, 0.25, 0.75, 0.75)]);
        let ImageOutcome::Processed(output) = engine.process(&ctx, &RgbImage::new(40, 40)).unwrap()
        else {
            panic!("expected processed image");
        };
        let stages: Vec<&str> = output.trace.timings.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            stages,
            vec![
                "oracle",
                "selection",
                "resize",
                "geometry_filter",
                "consensus",
                "hole_fill",
                "smoothing",
                "composition"
            ]
        );
    }

    #[test]
    fn equal_candidates_resolve_to_first_every_time() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let rect = (0.3, 0.3, 0.7, 0.7);
        let ctx = context(vec![rect, rect, rect]);
        let image = RgbImage::from_pixel(50, 50, image::Rgb([90, 90, 90]));

        let first = engine.process(&ctx, &image).unwrap();
        let second = engine.process(&ctx, &image).unwrap();
        let (ImageOutcome::Processed(a), ImageOutcome::Processed(b)) = (first, second) else {
            panic!("expected processed images");
        };
        assert_eq!(a.trace.selected_index, Some(0));
        assert_eq!(b.trace.selected_index, Some(0));
        assert_eq!(a.mask, b.mask);
        assert_eq!(a.canvas, b.canvas);
    }

    /// Answers the first call and fails every later one.
    struct OneShotOracle {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl SegmentationOracle for OneShotOracle {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn generate(
            &self,
            image: &RgbImage,
            _sampling: &OracleSampling,
        ) -> MatteResult<Vec<Candidate>> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call > 0 {
                return Err(MatteError::invalid_input("device lost"));
            }
            let (w, h) = image.dimensions();
            Ok(vec![Candidate::new(Mask::from_fn(w, h, |x, y| {
                x >= w / 4 && x < w * 3 / 4 && y >= h / 4 && y < h * 3 / 4
            }))])
        }
    }

    #[test]
    fn failed_rotated_pass_degrades_to_primary() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let oracle = OneShotOracle {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let ctx = SegmentationContext::new(Box::new(oracle), InferenceDevice::Cpu);
        let outcome = engine.process(&ctx, &RgbImage::new(40, 40)).unwrap();
        let ImageOutcome::Processed(output) = outcome else {
            panic!("expected processed image");
        };
        assert!(matches!(output.trace.consensus, ConsensusStatus::Degraded { .. }));
        assert!(output.mask.get(20, 20));
    }

    #[test]
    fn primary_oracle_failure_is_a_skip() {
        let engine = MatteEngine::new(small_config()).unwrap();
        let oracle = OneShotOracle {
            calls: std::sync::atomic::AtomicUsize::new(1),
        };
        let ctx = SegmentationContext::new(Box::new(oracle), InferenceDevice::Cpu);
        let outcome = engine.process(&ctx, &RgbImage::new(40, 40)).unwrap();
        assert!(matches!(
            outcome.skip_reason(),
            Some(SkipReason::OracleFailure(_))
        ));
    }

    #[test]
    fn disabled_consensus_is_not_run() {
        let mut config = small_config();
        config.consensus.enabled = false;
        let engine = MatteEngine::new(config).unwrap();
        let ctx = context(vec![(0.2, 0.2, 0.8, 0.8)]);
        let ImageOutcome::Processed(output) = engine.process(&ctx, &RgbImage::new(30, 30)).unwrap()
        else {
            panic!("expected processed image");
        };
        assert_eq!(output.trace.consensus, ConsensusStatus::NotRun);
    }
}
