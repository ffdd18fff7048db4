use kurbo::{Line, ParamCurveNearest, Point};

use crate::geometry::shape::PieceShape;

/// Width (px) of the outline stroke painted around the floating piece.
pub const BORDER_WIDTH: f64 = 1.5;

/// Transparent margin around the piece's bounding box, `ceil(BORDER_WIDTH)`,
/// so the stroke has room on every side.
pub const BORDER_PAD: u32 = 2;

/// Per-pixel classification of a piece's canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coverage {
    Outside,
    Inside,
    /// Outside the shape but within [`BORDER_WIDTH`] of its outline.
    Border,
}

/// Rasterized [`PieceShape`]; shared by the notch and the floating piece so
/// both cover exactly the same pixels.
///
/// Cells are addressed in canvas coordinates: the shape's bounding box
/// padded by [`BORDER_PAD`] on every side, so canvas `(pad, pad)` is the
/// bounding box's top-left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceMask {
    extent: u32,
    canvas: u32,
    cells: Vec<Coverage>,
}

impl PieceMask {
    #[tracing::instrument(skip(shape), fields(size = shape.size()))]
    pub fn rasterize(shape: &PieceShape) -> Self {
        let extent = shape.extent();
        let canvas = extent.saturating_add(2 * BORDER_PAD);
        let segments = shape.outline_segments();
        let origin = f64::from(BORDER_PAD) - 0.5;
        let mut cells = Vec::with_capacity((canvas as usize) * (canvas as usize));

        for y in 0..canvas {
            for x in 0..canvas {
                let centre = Point::new(f64::from(x) - origin, f64::from(y) - origin);
                let cov = if shape.contains(centre) {
                    Coverage::Inside
                } else if min_distance(&segments, centre) <= BORDER_WIDTH {
                    Coverage::Border
                } else {
                    Coverage::Outside
                };
                cells.push(cov);
            }
        }

        Self {
            extent,
            canvas,
            cells,
        }
    }

    /// Edge length of the shape's bounding box.
    pub fn extent(&self) -> u32 {
        self.extent
    }

    /// Edge length of the padded canvas (`extent + 2 * BORDER_PAD`).
    pub fn canvas(&self) -> u32 {
        self.canvas
    }

    pub fn pad(&self) -> u32 {
        BORDER_PAD
    }

    /// Coverage at canvas `(x, y)`; `Outside` beyond the canvas.
    pub fn at(&self, x: u32, y: u32) -> Coverage {
        if x >= self.canvas || y >= self.canvas {
            return Coverage::Outside;
        }
        self.cells[(y as usize) * (self.canvas as usize) + (x as usize)]
    }

    pub fn is_inside(&self, x: u32, y: u32) -> bool {
        self.at(x, y) == Coverage::Inside
    }

    pub fn count(&self, cov: Coverage) -> usize {
        self.cells.iter().filter(|&&c| c == cov).count()
    }
}

fn min_distance(segments: &[Line], p: Point) -> f64 {
    segments
        .iter()
        .map(|seg| seg.nearest(p, 0.0).distance_sq)
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

#[cfg(test)]
#[path = "../../tests/unit/render/mask.rs"]
mod tests;
