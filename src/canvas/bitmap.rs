use anyhow::Context;

use crate::{
    canvas::palette::Rgb,
    foundation::error::{PlacerError, PlacerResult},
};

pub const CHANNELS: usize = 4;

/// Straight-alpha RGBA8 pixels, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaBitmap {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> PlacerResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(PlacerError::geometry(format!(
                "{width}x{height} bitmap needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgba.repeat(n),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub fn same_size(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn rgba_at(&self, index: usize) -> [u8; 4] {
        let o = index * CHANNELS;
        [
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]
    }

    pub fn rgb_at(&self, index: usize) -> Rgb {
        let o = index * CHANNELS;
        Rgb::new(self.data[o], self.data[o + 1], self.data[o + 2])
    }

    pub fn alpha_at(&self, index: usize) -> u8 {
        self.data[index * CHANNELS + 3]
    }

    pub fn put(&mut self, index: usize, rgba: [u8; 4]) {
        let o = index * CHANNELS;
        self.data[o..o + CHANNELS].copy_from_slice(&rgba);
    }
}

/// Decode an encoded image (PNG in practice) into straight RGBA8.
///
/// Pixels stay un-premultiplied so palette comparison sees the stored channel values.
pub fn decode_bitmap(bytes: &[u8]) -> PlacerResult<RgbaBitmap> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbaBitmap::new(width, height, rgba.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/bitmap.rs"]
mod tests;
