//! Output canvas composition.
//!
//! Turns the final mask and the source photograph into a square canvas with
//! everything but the subject painted white.

use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::domain::{BoundingBox, Mask};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// How the subject is placed on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionMode {
    /// Padded bounding box scaled so its longer side fills the canvas.
    #[default]
    Letterbox,
    /// Unscaled window of `target_size` centred on the mask centroid.
    #[serde(alias = "centroid")]
    CentroidCrop,
}

impl FromStr for CompositionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "letterbox" => Ok(CompositionMode::Letterbox),
            "centroid" | "centroidcrop" | "centroid-crop" => Ok(CompositionMode::CentroidCrop),
            other => Err(format!(
                "unknown composition mode '{other}', expected 'letterbox' or 'centroid'"
            )),
        }
    }
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionMode::Letterbox => write!(f, "letterbox"),
            CompositionMode::CentroidCrop => write!(f, "centroid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub mode: CompositionMode,
    /// Side of the square output canvas.
    pub target_size: u32,
    /// Margin added around the tight bounding box before cropping.
    pub padding: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            mode: CompositionMode::Letterbox,
            target_size: 768,
            padding: 20,
        }
    }
}

impl ConfigValidator for CompositionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_u32(self.target_size, "composition.target_size")
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Why a mask could not be composed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("mask has no foreground pixels")]
    EmptyMask,
    #[error("padded crop has zero area")]
    DegenerateCrop,
    #[error("mask is {mask:?} but image is {image:?}")]
    DimensionMismatch { image: (u32, u32), mask: (u32, u32) },
}

#[derive(Debug, Clone)]
pub struct Composition {
    /// Exactly `target_size` x `target_size`.
    pub canvas: RgbImage,
    /// Region of the source image that was used.
    pub crop: BoundingBox,
}

#[derive(Debug, Clone, Default)]
pub struct CanvasComposer {
    config: CompositionConfig,
}

impl CanvasComposer {
    pub fn new(config: CompositionConfig) -> Self {
        Self { config }
    }

    pub fn target_size(&self) -> u32 {
        self.config.target_size
    }

    /// Composes `image` under `mask` onto a white square canvas.
    pub fn compose(&self, image: &RgbImage, mask: &Mask) -> Result<Composition, ComposeError> {
        if image.dimensions() != mask.dimensions() {
            return Err(ComposeError::DimensionMismatch {
                image: image.dimensions(),
                mask: mask.dimensions(),
            });
        }
        let tight = mask.bounding_box().ok_or(ComposeError::EmptyMask)?;

        let composition = match self.config.mode {
            CompositionMode::Letterbox => self.letterbox(image, mask, &tight)?,
            CompositionMode::CentroidCrop => self.centroid_crop(image, mask)?,
        };
        debug!(
            "Composed {} canvas from crop {}x{} at ({}, {})",
            self.config.mode,
            composition.crop.width,
            composition.crop.height,
            composition.crop.x,
            composition.crop.y
        );
        Ok(composition)
    }

    fn letterbox(
        &self,
        image: &RgbImage,
        mask: &Mask,
        tight: &BoundingBox,
    ) -> Result<Composition, ComposeError> {
        let (width, height) = image.dimensions();
        let crop = tight.expand(self.config.padding, width, height);
        if crop.is_degenerate() {
            return Err(ComposeError::DegenerateCrop);
        }

        let whitened = whiten_crop(image, mask, &crop);
        let target = self.config.target_size;
        let scale = target as f64 / crop.width.max(crop.height) as f64;
        let new_w = ((crop.width as f64 * scale).round() as u32).clamp(1, target);
        let new_h = ((crop.height as f64 * scale).round() as u32).clamp(1, target);
        let resized = imageops::resize(&whitened, new_w, new_h, imageops::FilterType::Lanczos3);

        let mut canvas = RgbImage::from_pixel(target, target, WHITE);
        let x_offset = (target - new_w) / 2;
        let y_offset = (target - new_h) / 2;
        imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);
        Ok(Composition { canvas, crop })
    }

    fn centroid_crop(&self, image: &RgbImage, mask: &Mask) -> Result<Composition, ComposeError> {
        let (width, height) = image.dimensions();
        let (cx, cy) = mask.centroid().ok_or(ComposeError::EmptyMask)?;
        let target = self.config.target_size as i64;
        let half = target / 2;
        let x0 = cx.floor() as i64 - half;
        let y0 = cy.floor() as i64 - half;

        // Part of the window that lies inside the image.
        let left = x0.max(0);
        let top = y0.max(0);
        let right = (x0 + target).min(width as i64);
        let bottom = (y0 + target).min(height as i64);
        if right <= left || bottom <= top {
            return Err(ComposeError::DegenerateCrop);
        }
        let crop = BoundingBox::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        );

        let whitened = whiten_crop(image, mask, &crop);
        let mut canvas = RgbImage::from_pixel(target as u32, target as u32, WHITE);
        imageops::overlay(&mut canvas, &whitened, left - x0, top - y0);
        Ok(Composition { canvas, crop })
    }
}

/// Copies `crop` out of `image`, painting pixels outside `mask` white.
fn whiten_crop(image: &RgbImage, mask: &Mask, crop: &BoundingBox) -> RgbImage {
    let mut out = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if !mask.get(crop.x + x, crop.y + y) {
            *pixel = WHITE;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([200, 10, 10]);

    fn scene(w: u32, h: u32, rect: (u32, u32, u32, u32)) -> (RgbImage, Mask) {
        let (x0, y0, x1, y1) = rect;
        let image = RgbImage::from_pixel(w, h, RED);
        let mask = Mask::from_fn(w, h, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1);
        (image, mask)
    }

    fn composer(mode: CompositionMode, target_size: u32, padding: u32) -> CanvasComposer {
        CanvasComposer::new(CompositionConfig {
            mode,
            target_size,
            padding,
        })
    }

    #[test]
    fn letterbox_output_is_exactly_target_square() {
        for (w, h) in [(300, 100), (100, 300), (37, 91), (500, 500)] {
            let (image, mask) = scene(w, h, (w / 4, h / 4, w / 2, h / 2));
            let out = composer(CompositionMode::Letterbox, 64, 5)
                .compose(&image, &mask)
                .unwrap();
            assert_eq!(out.canvas.dimensions(), (64, 64));
        }
    }

    #[test]
    fn letterbox_pads_and_whitens() {
        let (image, mask) = scene(100, 100, (40, 30, 60, 70));
        let out = composer(CompositionMode::Letterbox, 80, 10)
            .compose(&image, &mask)
            .unwrap();
        assert_eq!(out.crop, BoundingBox::new(30, 20, 40, 60));
        // Crop is taller than wide: subject centred, sides white.
        assert_eq!(*out.canvas.get_pixel(40, 40), RED);
        assert_eq!(*out.canvas.get_pixel(2, 40), WHITE);
        assert_eq!(*out.canvas.get_pixel(40, 2), WHITE);
    }

    #[test]
    fn padding_is_clamped_to_image() {
        let (image, mask) = scene(50, 50, (0, 0, 10, 10));
        let out = composer(CompositionMode::Letterbox, 32, 20)
            .compose(&image, &mask)
            .unwrap();
        assert_eq!(out.crop, BoundingBox::new(0, 0, 30, 30));
    }

    #[test]
    fn empty_mask_is_rejected() {
        let image = RgbImage::new(10, 10);
        let mask = Mask::new(10, 10);
        let err = CanvasComposer::default().compose(&image, &mask).unwrap_err();
        assert_eq!(err, ComposeError::EmptyMask);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let image = RgbImage::new(10, 10);
        let mask = Mask::filled(10, 9, true);
        assert!(matches!(
            CanvasComposer::default().compose(&image, &mask),
            Err(ComposeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn centroid_crop_centres_on_mass_and_pads_white() {
        let (image, mask) = scene(40, 40, (0, 0, 4, 4));
        let out = composer(CompositionMode::CentroidCrop, 20, 0)
            .compose(&image, &mask)
            .unwrap();
        assert_eq!(out.canvas.dimensions(), (20, 20));
        // Centroid (1, 1): window starts at (-9, -9).
        assert_eq!(out.crop, BoundingBox::new(0, 0, 11, 11));
        assert_eq!(*out.canvas.get_pixel(10, 10), RED);
        assert_eq!(*out.canvas.get_pixel(0, 0), WHITE);
        assert_eq!(*out.canvas.get_pixel(15, 15), WHITE);
    }

    #[test]
    fn centroid_crop_odd_target_is_exact() {
        let (image, mask) = scene(64, 48, (20, 10, 40, 30));
        let out = composer(CompositionMode::CentroidCrop, 33, 0)
            .compose(&image, &mask)
            .unwrap();
        assert_eq!(out.canvas.dimensions(), (33, 33));
    }

    #[test]
    fn mode_parses_from_cli_strings() {
        assert_eq!(
            "letterbox".parse::<CompositionMode>(),
            Ok(CompositionMode::Letterbox)
        );
        assert_eq!(
            "Centroid".parse::<CompositionMode>(),
            Ok(CompositionMode::CentroidCrop)
        );
        assert!("zoom".parse::<CompositionMode>().is_err());
    }
}
