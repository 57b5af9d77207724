//! Segment-Anything oracle.
//!
//! - `grid`: prompt point layout
//! - `preprocess`: encoder input tensor and prompt coordinate mapping
//! - `postprocess`: quality gates, deduplication and small-region cleanup
//! - `sam`: the [`SamAutomaticMaskGenerator`] oracle itself

pub mod grid;
pub mod postprocess;
pub mod preprocess;
pub mod sam;

pub use grid::{build_point_grid, scaled_point_grid};
pub use postprocess::{MaskProposal, RegionMode, non_max_suppression, remove_small_regions};
pub use preprocess::SamTransform;
pub use sam::SamAutomaticMaskGenerator;
