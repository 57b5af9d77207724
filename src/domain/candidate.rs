//! Candidate regions proposed by the segmentation oracle.

use super::mask::Mask;

/// One oracle proposal: a full-frame mask plus its foreground pixel count.
///
/// Candidates are read-only once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    mask: Mask,
    area: u64,
}

impl Candidate {
    /// Wraps `mask`, computing its area.
    pub fn new(mask: Mask) -> Self {
        let area = mask.count();
        Self { mask, area }
    }

    /// Wraps `mask` with an area reported by the oracle.
    pub fn with_area(mask: Mask, area: u64) -> Self {
        Self { mask, area }
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn area(&self) -> u64 {
        self.area
    }

    pub fn into_mask(self) -> Mask {
        self.mask
    }
}
