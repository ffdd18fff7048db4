use std::sync::Arc;

use crate::{
    assets::surface::RasterSurface,
    foundation::core::Rgba8Premul,
    foundation::error::{CaptchaError, CaptchaResult},
    foundation::math::mul_div255_u8,
    geometry::placement::Placement,
    geometry::shape::PieceShape,
    render::mask::{Coverage, PieceMask},
};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// The two layers a host draws: the source with the darkened notch, and the
/// floating piece cut out of the source.
#[derive(Clone, Debug)]
pub struct CaptchaLayers {
    pub background: RasterSurface,
    /// Padded canvas (`PieceMask::canvas` square), transparent outside the
    /// piece and its outline. Drawn with its top-left `pad` px up-left of the
    /// piece offset.
    pub piece: RasterSurface,
    pub placement: Placement,
    mask: Arc<PieceMask>,
}

impl CaptchaLayers {
    pub fn mask(&self) -> &PieceMask {
        &self.mask
    }

    /// Largest horizontal offset at which the piece layer still fits.
    pub fn max_offset(&self) -> u32 {
        self.background.width() - self.mask.extent()
    }

    /// One frame as the host would draw it: the piece layer over the
    /// background at `(offset_x, placement.y)`, with its padding clipped at the
    /// surface edge.
    pub fn compose_frame(&self, offset_x: u32) -> CaptchaResult<RasterSurface> {
        if offset_x > self.max_offset() {
            return Err(CaptchaError::invalid_geometry(format!(
                "piece offset {offset_x} exceeds {}",
                self.max_offset()
            )));
        }
        let mut out = self.background.data().to_vec();
        self.stamp(&mut out, offset_x, true);
        RasterSurface::from_premul_rgba8(self.background.width(), self.background.height(), out)
    }

    /// Put the piece's pixels back into the notch, without the outline.
    /// Reproduces the source exactly.
    pub fn reinsert(&self) -> CaptchaResult<RasterSurface> {
        let mut out = self.background.data().to_vec();
        self.stamp(&mut out, self.placement.x, false);
        RasterSurface::from_premul_rgba8(self.background.width(), self.background.height(), out)
    }

    // Piece canvas origin sits `pad` px up-left of `(offset_x, placement.y)`;
    // stroke pixels past the surface edge are clipped.
    fn stamp(&self, out: &mut [u8], offset_x: u32, with_border: bool) {
        let canvas = self.mask.canvas();
        let pad = i64::from(self.mask.pad());
        let (w, h) = (
            i64::from(self.background.width()),
            i64::from(self.background.height()),
        );
        for cy in 0..canvas {
            for cx in 0..canvas {
                let cov = self.mask.at(cx, cy);
                if cov == Coverage::Outside || (cov == Coverage::Border && !with_border) {
                    continue;
                }
                let x = i64::from(offset_x) + i64::from(cx) - pad;
                let y = i64::from(self.placement.y) + i64::from(cy) - pad;
                if x < 0 || y < 0 || x >= w || y >= h {
                    continue;
                }
                let src_i = self.piece.byte_index(cx, cy);
                let dst_i = self.background.byte_index(x as u32, y as u32);
                let p = &self.piece.data()[src_i..src_i + 4];
                let p = [p[0], p[1], p[2], p[3]];
                let px = match cov {
                    Coverage::Inside => p,
                    _ => {
                        let d = &out[dst_i..dst_i + 4];
                        over([d[0], d[1], d[2], d[3]], p, 1.0)
                    }
                };
                out[dst_i..dst_i + 4].copy_from_slice(&px);
            }
        }
    }
}

/// Renders the background-with-notch and floating-piece layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskCompositor {
    /// Overlay blended into the notch.
    pub notch_shade: Rgba8Premul,
    /// Outline stroke around the floating piece.
    pub border_color: Rgba8Premul,
}

impl Default for MaskCompositor {
    fn default() -> Self {
        Self {
            notch_shade: Rgba8Premul::from_straight_rgba(0, 0, 0, 140),
            border_color: Rgba8Premul::from_straight_rgba(255, 255, 255, 220),
        }
    }
}

impl MaskCompositor {
    #[tracing::instrument(skip(self, source, shape), fields(size = shape.size()))]
    pub fn composite(
        &self,
        source: &RasterSurface,
        shape: &PieceShape,
        placement: Placement,
    ) -> CaptchaResult<CaptchaLayers> {
        self.composite_mask(source, Arc::new(PieceMask::rasterize(shape)), placement)
    }

    /// Same as [`MaskCompositor::composite`] with a mask rasterized earlier.
    pub fn composite_mask(
        &self,
        source: &RasterSurface,
        mask: Arc<PieceMask>,
        placement: Placement,
    ) -> CaptchaResult<CaptchaLayers> {
        let extent = mask.extent();
        let fits_x = u64::from(placement.x) + u64::from(extent) <= u64::from(source.width());
        let fits_y = u64::from(placement.y) + u64::from(extent) <= u64::from(source.height());
        if !fits_x || !fits_y {
            return Err(CaptchaError::invalid_geometry(format!(
                "piece extent {extent} at ({}, {}) exceeds source {}x{}",
                placement.x,
                placement.y,
                source.width(),
                source.height()
            )));
        }

        let shade = self.notch_shade.to_array();
        let border = self.border_color.to_array();
        let canvas = mask.canvas();
        let pad = mask.pad();
        let mut background = source.data().to_vec();
        let mut piece = vec![0u8; (canvas as usize) * (canvas as usize) * 4];

        for cy in 0..canvas {
            for cx in 0..canvas {
                let piece_i = ((cy as usize) * (canvas as usize) + (cx as usize)) * 4;
                match mask.at(cx, cy) {
                    // inside cells lie within the bounding box, so cx, cy >= pad
                    Coverage::Inside => {
                        let src_i =
                            source.byte_index(placement.x + cx - pad, placement.y + cy - pad);
                        let s = &source.data()[src_i..src_i + 4];
                        piece[piece_i..piece_i + 4].copy_from_slice(s);
                        let dimmed = over([s[0], s[1], s[2], s[3]], shade, 1.0);
                        background[src_i..src_i + 4].copy_from_slice(&dimmed);
                    }
                    Coverage::Border => {
                        piece[piece_i..piece_i + 4].copy_from_slice(&border);
                    }
                    Coverage::Outside => {}
                }
            }
        }

        tracing::debug!(
            x = placement.x,
            y = placement.y,
            inside = mask.count(Coverage::Inside),
            "composited captcha layers"
        );

        Ok(CaptchaLayers {
            background: RasterSurface::from_premul_rgba8(
                source.width(),
                source.height(),
                background,
            )?,
            piece: RasterSurface::from_premul_rgba8(canvas, canvas, piece)?,
            placement,
            mask,
        })
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
