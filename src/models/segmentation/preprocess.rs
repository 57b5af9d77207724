//! Image and prompt preparation for the SAM image encoder.
//!
//! The encoder expects a fixed `1 x 3 x 1024 x 1024` tensor: the image is
//! resized so its longest side is 1024, normalised per channel and
//! zero-padded on the bottom and right.

use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;

/// Per-channel RGB mean on the 0..255 scale.
pub const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
/// Per-channel RGB standard deviation on the 0..255 scale.
pub const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];
/// Encoder input side.
pub const ENCODER_INPUT_SIZE: u32 = 1024;

/// Resizes to the encoder frame and maps prompt coordinates into it.
#[derive(Debug, Clone, Copy)]
pub struct SamTransform {
    target_length: u32,
}

impl Default for SamTransform {
    fn default() -> Self {
        Self {
            target_length: ENCODER_INPUT_SIZE,
        }
    }
}

impl SamTransform {
    pub fn new(target_length: u32) -> Self {
        Self { target_length }
    }

    pub fn target_length(&self) -> u32 {
        self.target_length
    }

    /// `(width, height)` after scaling the longest side to the target length.
    pub fn resized_dims(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height).max(1) as f64;
        let scale = self.target_length as f64 / longest;
        let new_w = ((width as f64 * scale) + 0.5).floor() as u32;
        let new_h = ((height as f64 * scale) + 0.5).floor() as u32;
        (new_w.max(1), new_h.max(1))
    }

    /// Maps a pixel coordinate of the original image into the resized frame.
    pub fn apply_coords(&self, point: [f32; 2], width: u32, height: u32) -> [f32; 2] {
        let (new_w, new_h) = self.resized_dims(width, height);
        [
            point[0] * (new_w as f32 / width.max(1) as f32),
            point[1] * (new_h as f32 / height.max(1) as f32),
        ]
    }

    /// Builds the normalised, zero-padded NCHW encoder input.
    pub fn prepare(&self, image: &RgbImage) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let (new_w, new_h) = self.resized_dims(width, height);
        let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

        let side = self.target_length as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
            }
        }
        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn longest_side_becomes_target() {
        let transform = SamTransform::default();
        assert_eq!(transform.resized_dims(2000, 1000), (1024, 512));
        assert_eq!(transform.resized_dims(300, 600), (512, 1024));
    }

    #[test]
    fn coordinates_follow_resize() {
        let transform = SamTransform::default();
        let mapped = transform.apply_coords([1000.0, 500.0], 2000, 1000);
        assert!((mapped[0] - 512.0).abs() < 1e-3);
        assert!((mapped[1] - 256.0).abs() < 1e-3);
    }

    #[test]
    fn prepare_normalises_and_pads() {
        let transform = SamTransform::new(8);
        let image = RgbImage::from_pixel(8, 4, Rgb([124, 116, 104]));
        let tensor = transform.prepare(&image);
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        // Inside the image: close to zero after normalisation.
        assert!(tensor[[0, 0, 1, 1]].abs() < 0.01);
        // Padding rows stay exactly zero.
        assert_eq!(tensor[[0, 2, 6, 3]], 0.0);
    }
}
