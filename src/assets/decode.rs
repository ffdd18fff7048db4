use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use crate::{
    assets::surface::RasterSurface,
    foundation::error::{CaptchaError, CaptchaResult},
};

/// Decode encoded image bytes into a premultiplied surface.
pub fn decode_image(bytes: &[u8]) -> CaptchaResult<RasterSurface> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| CaptchaError::acquisition_failed(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterSurface::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Read and decode an image file (the "resource identifier" source).
pub fn load_image(path: &Path) -> CaptchaResult<RasterSurface> {
    let bytes = std::fs::read(path).map_err(|e| {
        CaptchaError::acquisition_failed(format!("read image '{}': {e}", path.display()))
    })?;
    decode_image(&bytes)
}

/// Encode a surface as PNG (straight alpha).
pub fn encode_png(surface: &RasterSurface) -> CaptchaResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(
        surface.width(),
        surface.height(),
        surface.to_straight_rgba8(),
    )
    .context("wrap surface pixels as rgba image")?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8(rgba: &[u8]) -> Vec<u8> {
    let mut out = rgba.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
