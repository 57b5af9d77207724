//! Mask refinement stages.
//!
//! Each module implements one named, independently testable transform of
//! the per-image pipeline, in execution order:
//!
//! * `selection` - choose one oracle candidate by central band coverage
//! * `resize` - working-scale downscaling and nearest-neighbour mask restore
//! * `geometry_filter` - drop floor, wall and side-wall components
//! * `consensus` - intersect with a second pass over the 180-degree rotated image
//! * `hole_fill` - reclassify small enclosed background islands
//! * `morphology` - closing then opening with a disk
//! * `compose` - crop, whiten and place on a square canvas

pub mod compose;
pub mod consensus;
pub mod geometry_filter;
pub mod hole_fill;
pub mod morphology;
pub mod resize;
pub mod selection;

pub use compose::{
    CanvasComposer, ComposeError, Composition, CompositionConfig, CompositionMode,
};
pub use consensus::{ConsensusConfig, ConsensusOutcome, OrientationConsensus, combine};
pub use geometry_filter::{FilterReport, GeometryFilter, GeometryFilterConfig, SurfaceKind};
pub use hole_fill::{HoleFillConfig, HoleFillReport, HoleFiller, percentile};
pub use morphology::{MorphologicalSmoother, SmoothingConfig};
pub use resize::{ResolutionNormalizer, ScalingConfig, WorkingScale};
pub use selection::{CandidateSelector, Selection, SelectionConfig};
