//! The colorchart template image.
//!
//! Pixels are kept as interleaved BGR bytes. Colors coming from the chart
//! values and from measurements are in display (RGB) order and are converted
//! with [`crate::color::to_storage`] before touching the buffer.

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use palette::Srgb;

use crate::color::{from_storage, to_storage};
use crate::error::ChartError;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartCanvas {
    width: u32,
    height: u32,
    /// BGR, row-major.
    data: Vec<u8>,
}

impl ChartCanvas {
    /// Canvas filled with a single color.
    pub fn filled(width: u32, height: u32, color: Srgb<u8>) -> Self {
        let px = to_storage(color);
        let data = px
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        ChartCanvas {
            width,
            height,
            data,
        }
    }

    /// Wrap a raw BGR buffer.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> crate::error::Result<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return Err(ChartError::CanvasSize {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(ChartCanvas {
            width,
            height,
            data,
        })
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let mut data = img.as_raw().clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        ChartCanvas {
            width: img.width(),
            height: img.height(),
            data,
        }
    }

    pub fn to_rgb_image(&self) -> crate::error::Result<RgbImage> {
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        let len = data.len();
        RgbImage::from_raw(self.width, self.height, data).ok_or(ChartError::CanvasSize {
            width: self.width,
            height: self.height,
            len,
        })
    }

    /// Decode an image file; any alpha channel is dropped.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("loading template image {}", path.display()))?
            .to_rgb8();
        log::debug!(
            "loaded {}x{} template from {}",
            img.width(),
            img.height(),
            path.display()
        );
        Ok(Self::from_rgb_image(&img))
    }

    /// Encode to a file, format chosen by extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_rgb_image()?
            .save(path)
            .with_context(|| format!("writing image {}", path.display()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel in storage (BGR) order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Pixel as a display color.
    pub fn color_at(&self, x: u32, y: u32) -> Option<Srgb<u8>> {
        self.pixel(x, y).map(from_storage)
    }

    /// Paint an axis-aligned rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Srgb<u8>) {
        let px = to_storage(color);
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                let i = (row as usize * self.width as usize + col as usize) * 3;
                self.data[i..i + 3].copy_from_slice(&px);
            }
        }
    }

    /// Replace every pixel exactly equal to `reference` with `replacement`.
    ///
    /// Returns the number of pixels changed.
    pub fn replace(&mut self, reference: Srgb<u8>, replacement: Srgb<u8>) -> usize {
        let target = to_storage(reference);
        let new = to_storage(replacement);
        let mut count = 0;
        for px in self.data.chunks_exact_mut(3) {
            if *px == target[..] {
                px.copy_from_slice(&new);
                count += 1;
            }
        }
        count
    }
}
