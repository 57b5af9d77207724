//! The subject-isolation pipeline.
//!
//! - [`PipelineConfig`] / [`ConfigLoader`]: stage thresholds and file loading
//! - [`SegmentationContext`]: the oracle handle owned by the caller
//! - [`MatteEngine`]: one image from oracle proposals to composed canvas
//! - [`BatchRunner`] / [`BatchStats`]: a directory of images and its summary

pub mod batch;
pub mod config;
pub mod context;
pub mod engine;
pub mod stages;
pub mod stats;

pub use batch::BatchRunner;
pub use config::{ConfigFormat, ConfigLoader, PipelineConfig};
pub use context::SegmentationContext;
pub use engine::{ImageOutcome, MatteEngine, MatteOutput};
pub use stages::{ConsensusStatus, MaskRefiner, StageTrace};
pub use stats::BatchStats;
