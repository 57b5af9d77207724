//! Traits at the seams of the pipeline.

pub mod oracle;

pub use oracle::{OracleSampling, SegmentationOracle};
