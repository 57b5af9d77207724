//! Removal of edge-anchored environmental surfaces.
//!
//! In object photography the large connected regions glued to an image edge
//! are nearly always floors, ceilings or backdrops. Each 8-connected
//! component of the mask is tested against three bounding-box rules and
//! dropped whole when any of them matches.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::{ComponentSet, ConnectedComponent, Mask};

/// Size ratios for the surface rules, relative to the full frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryFilterConfig {
    pub enabled: bool,
    /// A floor band is shorter than this fraction of the height.
    pub floor_max_height: f64,
    /// A floor band is wider than this fraction of the width.
    pub floor_min_width: f64,
    /// An upper wall is taller than this fraction of the height.
    pub wall_min_height: f64,
    /// A side wall is wider than this fraction of the width.
    pub side_wall_min_width: f64,
}

impl Default for GeometryFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            floor_max_height: 0.20,
            floor_min_width: 0.50,
            wall_min_height: 0.25,
            side_wall_min_width: 0.80,
        }
    }
}

impl ConfigValidator for GeometryFilterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ratio(self.floor_max_height, "geometry.floor_max_height")?;
        self.validate_ratio(self.floor_min_width, "geometry.floor_min_width")?;
        self.validate_ratio(self.wall_min_height, "geometry.wall_min_height")?;
        self.validate_ratio(self.side_wall_min_width, "geometry.side_wall_min_width")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Which rule flagged a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Thin and wide, touching the bottom edge.
    Floor,
    /// Tall, touching the top edge.
    UpperWall,
    /// Spanning left to right edge.
    SideWall,
}

/// What one filter application did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    /// Components in the input mask.
    pub components: usize,
    /// Components that matched a surface rule.
    pub removed: Vec<(SurfaceKind, ConnectedComponent)>,
    /// True when every component matched and the input was kept instead.
    pub reverted: bool,
}

/// Drops floor, upper-wall and side-wall components from a mask.
///
/// The filter never returns a blank mask for a non-blank input: if every
/// component is classified as a surface the input comes back unchanged and
/// the report is marked `reverted`. Applying the filter to its own output is
/// a no-op.
#[derive(Debug, Clone, Default)]
pub struct GeometryFilter {
    config: GeometryFilterConfig,
}

impl GeometryFilter {
    pub fn new(config: GeometryFilterConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Classifies one component inside a `width` x `height` frame.
    pub fn classify(
        &self,
        component: &ConnectedComponent,
        width: u32,
        height: u32,
    ) -> Option<SurfaceKind> {
        let bbox = &component.bbox;
        let (w, h) = (bbox.width as f64, bbox.height as f64);
        let (frame_w, frame_h) = (width as f64, height as f64);

        let touches_bottom = bbox.bottom() >= height.saturating_sub(1);
        let touches_top = bbox.y == 0;
        let touches_left = bbox.x == 0;
        let touches_right = bbox.right() >= width.saturating_sub(1);

        if touches_bottom
            && h < self.config.floor_max_height * frame_h
            && w > self.config.floor_min_width * frame_w
        {
            Some(SurfaceKind::Floor)
        } else if touches_top && h > self.config.wall_min_height * frame_h {
            Some(SurfaceKind::UpperWall)
        } else if touches_left && touches_right && w > self.config.side_wall_min_width * frame_w {
            Some(SurfaceKind::SideWall)
        } else {
            None
        }
    }

    /// Filters `mask`, returning the cleaned mask and a report.
    pub fn apply(&self, mask: &Mask) -> (Mask, FilterReport) {
        let (width, height) = mask.dimensions();
        let set = ComponentSet::label(mask);

        let removed: Vec<(SurfaceKind, ConnectedComponent)> = set
            .components()
            .iter()
            .filter_map(|c| self.classify(c, width, height).map(|kind| (kind, *c)))
            .collect();

        let mut report = FilterReport {
            components: set.len(),
            removed,
            reverted: false,
        };

        if report.removed.is_empty() {
            debug!("Geometry filter kept all {} components", report.components);
            return (mask.clone(), report);
        }

        let mut drop = vec![false; set.max_label() as usize + 1];
        for (_, component) in &report.removed {
            drop[component.label as usize] = true;
        }
        let filtered = set.select(|label| !drop[label as usize]);

        if filtered.is_blank() {
            debug!(
                "Geometry filter matched all {} components; keeping unfiltered mask",
                report.components
            );
            report.reverted = true;
            return (mask.clone(), report);
        }

        debug!(
            "Geometry filter removed {}/{} components",
            report.removed.len(),
            report.components
        );
        (filtered, report)
    }
}
