//! Model implementations behind the oracle trait.
//!
//! The refinement engine only talks to [`crate::core::SegmentationOracle`];
//! this module holds the ONNX Runtime backed implementation.

pub mod segmentation;

pub use segmentation::SamAutomaticMaskGenerator;
