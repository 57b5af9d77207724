//! Filtering of raw decoder masks into candidate regions.

use crate::core::errors::MatteResult;
use crate::domain::{BoundingBox, ComponentSet, Mask};

/// Logit above which a pixel is foreground.
pub const MASK_THRESHOLD: f32 = 0.0;
/// Logit jitter used for the stability score.
pub const STABILITY_OFFSET: f32 = 1.0;

/// A decoded mask that passed the quality gates.
#[derive(Debug, Clone)]
pub struct MaskProposal {
    pub mask: Mask,
    pub bbox: BoundingBox,
    pub predicted_iou: f32,
    pub stability: f32,
}

/// Ratio of the area above `threshold + offset` to the area above `threshold - offset`.
///
/// Masks whose extent barely moves under a shift of the logit cutoff are
/// stable. An empty outer area scores 0.
pub fn stability_score(logits: &[f32], threshold: f32, offset: f32) -> f32 {
    let high = threshold + offset;
    let low = threshold - offset;
    let (mut intersections, mut unions) = (0u64, 0u64);
    for &v in logits {
        if v > high {
            intersections += 1;
        }
        if v > low {
            unions += 1;
        }
    }
    if unions == 0 {
        0.0
    } else {
        intersections as f32 / unions as f32
    }
}

/// Thresholds a row-major logit plane into a mask.
pub fn binarize(logits: &[f32], width: u32, height: u32, threshold: f32) -> MatteResult<Mask> {
    Mask::from_raw(width, height, logits.iter().map(|&v| v > threshold).collect())
}

/// Greedy suppression by bounding-box IoU, highest predicted IoU first.
///
/// Equal scores keep their input order.
pub fn non_max_suppression(mut proposals: Vec<MaskProposal>, iou_thresh: f32) -> Vec<MaskProposal> {
    proposals.sort_by(|a, b| b.predicted_iou.total_cmp(&a.predicted_iou));
    let mut kept: Vec<MaskProposal> = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        if kept.iter().all(|k| k.bbox.iou(&proposal.bbox) <= iou_thresh) {
            kept.push(proposal);
        }
    }
    kept
}

/// Which small regions [`remove_small_regions`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMode {
    /// Background regions smaller than the floor become foreground.
    Holes,
    /// Foreground regions smaller than the floor become background.
    Islands,
}

/// Removes regions below `min_area`, returning the mask and whether it changed.
///
/// In island mode the largest component is kept even when it is below the
/// floor, so a non-blank mask never becomes blank here.
pub fn remove_small_regions(mask: &Mask, min_area: u64, mode: RegionMode) -> (Mask, bool) {
    let working = match mode {
        RegionMode::Holes => mask.invert(),
        RegionMode::Islands => mask.clone(),
    };
    let set = ComponentSet::label(&working);
    let small: Vec<u32> = set
        .components()
        .iter()
        .filter(|c| c.area < min_area)
        .map(|c| c.label)
        .collect();
    if small.is_empty() {
        return (mask.clone(), false);
    }

    let mut drop = vec![false; set.max_label() as usize + 1];
    for &label in &small {
        drop[label as usize] = true;
    }
    if mode == RegionMode::Islands && small.len() == set.len() {
        if let Some(largest) = set.components().iter().max_by_key(|c| c.area) {
            drop[largest.label as usize] = false;
        }
    }

    let kept = set.select(|label| !drop[label as usize]);
    let cleaned = match mode {
        RegionMode::Holes => kept.invert(),
        RegionMode::Islands => kept,
    };
    (cleaned, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(bbox: BoundingBox, iou: f32) -> MaskProposal {
        MaskProposal {
            mask: Mask::new(1, 1),
            bbox,
            predicted_iou: iou,
            stability: 1.0,
        }
    }

    #[test]
    fn stability_of_sharp_mask_is_one() {
        let logits = [5.0, 5.0, -5.0, -5.0];
        assert_eq!(stability_score(&logits, MASK_THRESHOLD, STABILITY_OFFSET), 1.0);
    }

    #[test]
    fn stability_drops_for_soft_edges() {
        let logits = [5.0, 0.5, 0.5, -5.0];
        let score = stability_score(&logits, MASK_THRESHOLD, STABILITY_OFFSET);
        assert!((score - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(stability_score(&[-3.0, -3.0], 0.0, 1.0), 0.0);
    }

    #[test]
    fn binarize_checks_plane_size() {
        let mask = binarize(&[1.0, -1.0, 0.0, 2.0], 2, 2, 0.0).unwrap();
        assert_eq!(mask.as_slice(), &[true, false, false, true]);
        assert!(binarize(&[1.0], 2, 2, 0.0).is_err());
    }

    #[test]
    fn nms_keeps_best_of_overlapping_boxes() {
        let a = proposal(BoundingBox::new(0, 0, 10, 10), 0.91);
        let b = proposal(BoundingBox::new(1, 0, 10, 10), 0.97);
        let c = proposal(BoundingBox::new(50, 50, 10, 10), 0.92);
        let kept = non_max_suppression(vec![a, b, c], 0.7);
        let scores: Vec<f32> = kept.iter().map(|p| p.predicted_iou).collect();
        assert_eq!(scores, vec![0.97, 0.92]);
    }

    #[test]
    fn small_holes_are_filled_and_small_islands_removed() {
        let mut mask = Mask::from_fn(20, 20, |x, y| (2..12).contains(&x) && (2..12).contains(&y));
        mask.set(6, 6, false);
        mask.set(17, 17, true);

        let (filled, changed) = remove_small_regions(&mask, 4, RegionMode::Holes);
        assert!(changed);
        assert!(filled.get(6, 6));

        let (cleaned, changed) = remove_small_regions(&filled, 4, RegionMode::Islands);
        assert!(changed);
        assert!(!cleaned.get(17, 17));
        assert_eq!(cleaned.count(), 100);
    }

    #[test]
    fn islands_keep_largest_when_all_small() {
        let mut mask = Mask::new(10, 10);
        mask.set(1, 1, true);
        mask.set(5, 5, true);
        mask.set(6, 5, true);
        let (cleaned, _) = remove_small_regions(&mask, 100, RegionMode::Islands);
        assert_eq!(cleaned.count(), 2);
        assert!(cleaned.get(5, 5));
    }
}
