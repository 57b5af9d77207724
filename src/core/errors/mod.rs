//! Error types for the matting pipeline.
//!
//! Hard failures (bad configuration, missing models, inference crashes) are
//! [`MatteError`]s. Per-image problems that only exclude one image from the
//! output are [`SkipReason`]s.

pub mod constructors;
pub mod types;

pub use types::{MatteError, ProcessingStage, SimpleError, SkipReason};

/// Convenient result alias for matting operations.
pub type MatteResult<T> = Result<T, MatteError>;
