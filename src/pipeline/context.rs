//! The explicitly owned segmentation context.

use crate::core::config::InferenceDevice;
use crate::core::traits::SegmentationOracle;

/// Oracle handle plus the device it runs on.
///
/// Built once by the caller before a batch and passed by reference into
/// every per-image call; nothing in the pipeline holds it globally.
pub struct SegmentationContext {
    oracle: Box<dyn SegmentationOracle>,
    device: InferenceDevice,
}

impl SegmentationContext {
    pub fn new(oracle: Box<dyn SegmentationOracle>, device: InferenceDevice) -> Self {
        Self { oracle, device }
    }

    pub fn oracle(&self) -> &dyn SegmentationOracle {
        self.oracle.as_ref()
    }

    pub fn device(&self) -> InferenceDevice {
        self.device
    }
}

impl std::fmt::Debug for SegmentationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationContext")
            .field("oracle", &self.oracle.name())
            .field("device", &self.device)
            .finish()
    }
}
