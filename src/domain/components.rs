//! Connected-component labelling of masks.
//!
//! Labelling is delegated to `imageproc::region_labelling` with
//! 8-connectivity; this module gathers per-component statistics and lets
//! callers drop or keep whole components by label.

use image::{ImageBuffer, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use super::mask::{BoundingBox, Mask};

/// A maximal 8-connected set of foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedComponent {
    /// Label in the owning [`ComponentSet`], never 0.
    pub label: u32,
    pub bbox: BoundingBox,
    pub area: u64,
}

impl ConnectedComponent {
    /// Whether any pixel lies on the outermost ring of a `width` x `height` frame.
    pub fn touches_border(&self, width: u32, height: u32) -> bool {
        self.bbox.x == 0
            || self.bbox.y == 0
            || self.bbox.right() >= width
            || self.bbox.bottom() >= height
    }
}

/// The components of one mask together with the label image.
///
/// Components partition the foreground exactly: every `true` pixel carries
/// one non-zero label and every `false` pixel carries 0.
pub struct ComponentSet {
    labels: ImageBuffer<Luma<u32>, Vec<u32>>,
    components: Vec<ConnectedComponent>,
    max_label: u32,
}

impl ComponentSet {
    /// Labels the foreground of `mask`.
    pub fn label(mask: &Mask) -> Self {
        let (width, height) = mask.dimensions();
        let labels = connected_components(&mask.to_gray(), Connectivity::Eight, Luma([0u8]));

        let max_label = labels.as_raw().iter().copied().max().unwrap_or(0);
        // (min_x, min_y, max_x, max_y, area) per label
        let mut stats = vec![(u32::MAX, u32::MAX, 0u32, 0u32, 0u64); max_label as usize + 1];
        for (i, &label) in labels.as_raw().iter().enumerate() {
            if label == 0 {
                continue;
            }
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            let entry = &mut stats[label as usize];
            entry.0 = entry.0.min(x);
            entry.1 = entry.1.min(y);
            entry.2 = entry.2.max(x);
            entry.3 = entry.3.max(y);
            entry.4 += 1;
        }

        let components = stats
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.4 > 0)
            .map(|(label, &(x0, y0, x1, y1, area))| ConnectedComponent {
                label: label as u32,
                bbox: BoundingBox::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
                area,
            })
            .collect();

        debug_assert_eq!(labels.dimensions(), (width, height));
        Self {
            labels,
            components,
            max_label,
        }
    }

    pub fn components(&self) -> &[ConnectedComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Largest label in use, 0 when there is no foreground.
    pub fn max_label(&self) -> u32 {
        self.max_label
    }

    /// Label at `(x, y)`, 0 for background.
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels.get_pixel(x, y)[0]
    }

    /// Areas of every component, in label order.
    pub fn areas(&self) -> Vec<u64> {
        self.components.iter().map(|c| c.area).collect()
    }

    /// Mask containing only the components whose label satisfies `keep`.
    pub fn select(&self, keep: impl Fn(u32) -> bool) -> Mask {
        let lookup: Vec<bool> = (0..=self.max_label)
            .map(|label| label != 0 && keep(label))
            .collect();
        let (width, height) = self.labels.dimensions();
        let data = self
            .labels
            .as_raw()
            .iter()
            .map(|&label| lookup[label as usize])
            .collect();
        Mask::from_raw(width, height, data).unwrap_or_else(|_| Mask::new(width, height))
    }
}
