//! # Subject Matte
//!
//! Isolates the photographed subject and whitens everything else, producing
//! clean square inputs for 3D-reconstruction pipelines.
//!
//! A promptless segmentation oracle proposes dozens of candidate regions per
//! photograph. The refinement engine picks one, strips floors and walls
//! with geometric priors, cross-checks it against a second pass over the
//! upside-down image, patches small gaps and smooths the boundary before
//! composing a fixed-size canvas.
//!
//! ## Stages
//!
//! 1. **Candidate selection**: vertical band coverage, largest area as fallback
//! 2. **Resolution normalisation**: nearest-neighbour restore from the working scale
//! 3. **Geometry filter**: floor, upper-wall and side-wall components removed
//! 4. **Orientation consensus**: AND with the 180-degree rotated pass
//! 5. **Hole filling**: small enclosed background islands reclassified
//! 6. **Morphological smoothing**: closing then opening with a disk
//! 7. **Canvas composition**: letterbox or centroid crop on white
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration validation, ONNX sessions and the oracle trait
//! * [`domain`] - Masks, candidates and connected components
//! * [`models`] - The Segment-Anything oracle over ONNX Runtime
//! * [`pipeline`] - Engine, batch runner, configuration files and statistics
//! * [`processors`] - One module per refinement stage
//! * [`utils`] - Image I/O and directory listing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subject_matte::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = OrtSessionConfig::new();
//! let oracle = SamAutomaticMaskGenerator::from_paths(
//!     "models/sam_vit_b_encoder.onnx",
//!     "models/sam_vit_b_decoder.onnx",
//!     &session,
//! )?;
//! let context = SegmentationContext::new(Box::new(oracle), session.device);
//!
//! let engine = MatteEngine::new(PipelineConfig::default())?;
//! let stats = BatchRunner::new(engine).run(&context, Path::new("raw"), Path::new("clean"))?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use subject_matte::prelude::*;
/// ```
///
/// Covers running a batch end to end. Individual stages live in
/// [`crate::processors`].
pub mod prelude {
    pub use crate::core::{
        InferenceDevice, MatteError, MatteResult, OracleSampling, OrtSessionConfig,
        SegmentationOracle, SkipReason,
    };
    pub use crate::domain::{Candidate, Mask};
    pub use crate::models::SamAutomaticMaskGenerator;
    pub use crate::pipeline::{
        BatchRunner, BatchStats, ImageOutcome, MatteEngine, MatteOutput, PipelineConfig,
        SegmentationContext,
    };
    pub use crate::utils::load_image;
}
