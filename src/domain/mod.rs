//! Domain types shared by every pipeline stage.
//!
//! - [`Mask`]: the boolean foreground grid every stage transforms
//! - [`Candidate`]: an oracle proposal `{mask, area}`
//! - [`ComponentSet`] / [`ConnectedComponent`]: 8-connected labelling of a mask

pub mod candidate;
pub mod components;
pub mod mask;

pub use candidate::Candidate;
pub use components::{ComponentSet, ConnectedComponent};
pub use mask::{BoundingBox, Mask};
