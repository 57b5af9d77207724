//! Binary foreground masks.
//!
//! A [`Mask`] is a dense row-major grid of booleans with the same width and
//! height as the image it classifies. Every pixel is either foreground
//! (`true`) or background (`false`); there is no "unknown" state.

use image::{GrayImage, Luma};
use rayon::prelude::*;

use crate::core::errors::{MatteError, MatteResult};

/// Rows per rayon task when resampling.
const PARALLEL_ROW_THRESHOLD: u32 = 256;

/// Axis-aligned pixel rectangle, `x`/`y` inclusive, `width`/`height` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grows the box by `padding` on every side, clamped to `[0, bound_w) x [0, bound_h)`.
    pub fn expand(&self, padding: u32, bound_w: u32, bound_h: u32) -> Self {
        let x0 = self.x.saturating_sub(padding);
        let y0 = self.y.saturating_sub(padding);
        let x1 = self.right().saturating_add(padding).min(bound_w);
        let y1 = self.bottom().saturating_add(padding).min(bound_h);
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Intersection-over-union with `other`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = self.right().min(other.right());
        let iy1 = self.bottom().min(other.bottom());
        if ix1 <= ix0 || iy1 <= iy0 {
            return 0.0;
        }
        let inter = (ix1 - ix0) as u64 * (iy1 - iy0) as u64;
        let union = self.area() + other.area() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }
}

/// Boolean foreground mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Creates an all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    pub fn filled(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Builds a mask from a raw row-major buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<bool>) -> MatteResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MatteError::invalid_input(format!(
                "mask buffer has {} pixels, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a mask by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Any non-zero pixel becomes foreground.
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.as_raw().iter().map(|&v| v > 0).collect(),
        }
    }

    /// Foreground as 255, background as 0.
    pub fn to_gray(&self) -> GrayImage {
        let raw = self.data.iter().map(|&v| if v { 255 } else { 0 }).collect();
        GrayImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| GrayImage::from_pixel(self.width, self.height, Luma([0])))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Returns the pixel at `(x, y)`. Out-of-range coordinates read as background.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx] = value;
        }
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    /// True when no pixel is foreground.
    pub fn is_blank(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Foreground pixels within rows `[start, end)`.
    pub fn count_in_rows(&self, start: u32, end: u32) -> u64 {
        let end = end.min(self.height);
        if start >= end {
            return 0;
        }
        let from = self.index(0, start);
        let to = self.index(0, end);
        self.data[from..to].iter().filter(|&&v| v).count() as u64
    }

    /// Flips every pixel.
    pub fn invert(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    /// Pixel-wise logical AND.
    pub fn and(&self, other: &Mask) -> MatteResult<Self> {
        self.ensure_same_dimensions(other)?;
        Ok(Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| a && b)
                .collect(),
        })
    }

    /// Pixel-wise logical OR.
    pub fn or(&self, other: &Mask) -> MatteResult<Self> {
        self.ensure_same_dimensions(other)?;
        Ok(Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| a || b)
                .collect(),
        })
    }

    fn ensure_same_dimensions(&self, other: &Mask) -> MatteResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(MatteError::invalid_input(format!(
                "mask dimensions differ: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }

    /// Rotates the mask by 180 degrees.
    ///
    /// In row-major order this is a plain reversal of the buffer.
    pub fn rotate180(&self) -> Self {
        let mut data = self.data.clone();
        data.reverse();
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Tight bounding box of the foreground, `None` for a blank mask.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut any = false;
        for y in 0..self.height {
            let row = &self.data[self.index(0, y)..self.index(0, y) + self.width as usize];
            let Some(first) = row.iter().position(|&v| v) else {
                continue;
            };
            let last = row.iter().rposition(|&v| v).unwrap_or(first);
            any = true;
            min_x = min_x.min(first as u32);
            max_x = max_x.max(last as u32);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        any.then(|| BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Mean foreground coordinate `(x, y)`, `None` for a blank mask.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (mut sx, mut sy, mut n) = (0f64, 0f64, 0u64);
        for (i, &v) in self.data.iter().enumerate() {
            if v {
                sx += (i % self.width as usize) as f64;
                sy += (i / self.width as usize) as f64;
                n += 1;
            }
        }
        (n > 0).then(|| (sx / n as f64, sy / n as f64))
    }

    /// Nearest-neighbour resample to `width` x `height`.
    ///
    /// Source index is `floor(dst * src_len / dst_len)`, so the output is
    /// strictly binary and an identity resize is lossless.
    pub fn resize_nearest(&self, width: u32, height: u32) -> Self {
        if (width, height) == self.dimensions() {
            return self.clone();
        }
        let mut data = vec![false; width as usize * height as usize];
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return Self {
                width,
                height,
                data,
            };
        }

        let src_cols: Vec<usize> = (0..width as u64)
            .map(|x| ((x * self.width as u64) / width as u64) as usize)
            .collect();
        let fill_row = |(y, row): (usize, &mut [bool])| {
            let sy = (y as u64 * self.height as u64 / height as u64) as usize;
            let src_row = &self.data[sy * self.width as usize..(sy + 1) * self.width as usize];
            for (dst, &sx) in row.iter_mut().zip(src_cols.iter()) {
                *dst = src_row[sx];
            }
        };

        if height > PARALLEL_ROW_THRESHOLD {
            data.par_chunks_mut(width as usize)
                .enumerate()
                .for_each(fill_row);
        } else {
            data.chunks_mut(width as usize).enumerate().for_each(fill_row);
        }

        Self {
            width,
            height,
            data,
        }
    }
}
