//! ONNX Runtime session construction.

pub mod session;

pub use session::{load_session, model_name_from_path};
