use std::sync::Arc;

use crate::{
    assets::decode::{premultiply_rgba8_in_place, unpremultiply_rgba8},
    foundation::core::{Extent, Rgba8Premul},
    foundation::error::{CaptchaError, CaptchaResult},
    foundation::math::Fnv1a64,
};

/// Immutable 2D pixel buffer: the source image and every derived layer.
///
/// Pixels are row-major, tightly packed premultiplied RGBA8. Clones share
/// the underlying buffer, so handing a surface to the host is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl RasterSurface {
    /// Wrap an already-premultiplied RGBA8 buffer.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> CaptchaResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptchaError::invalid_geometry(format!(
                "surface must be non-empty, got {width}x{height}"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| CaptchaError::invalid_geometry("surface size overflow"))?;
        if data.len() != expected {
            return Err(CaptchaError::invalid_geometry(format!(
                "expected {expected} bytes for {width}x{height} rgba8, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        })
    }

    /// Wrap a straight (non-premultiplied) RGBA8 buffer.
    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> CaptchaResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul_rgba8(width, height, data)
    }

    /// A surface filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> CaptchaResult<Self> {
        let px = color.to_array();
        let count = Extent::new(width, height).pixel_count();
        Self::from_premul_rgba8(width, height, px.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        self.rgba8_premul.as_slice()
    }

    /// Pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.byte_index(x, y);
        let d = self.data();
        Some([d[i], d[i + 1], d[i + 2], d[i + 3]])
    }

    /// Content hash over dimensions and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        h.write_bytes(self.data());
        h.finish()
    }

    /// Straight-alpha copy of the pixels, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        unpremultiply_rgba8(self.data())
    }

    pub(crate) fn byte_index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/surface.rs"]
mod tests;
