use kurbo::{BezPath, Line, PathEl, Point, Shape};

use crate::foundation::error::{CaptchaError, CaptchaResult};

/// Tab overflow beyond the square body, as a fraction of `size`.
pub const TAB_RATIO: f64 = 0.2;

/// Neck width of each tab, as a fraction of `size`.
const NECK_RATIO: f64 = 0.4;

/// Flattening tolerance (px) used when the outline is turned into segments.
const FLATTEN_TOLERANCE: f64 = 0.05;

/// Closed jigsaw outline in local coordinates.
///
/// The origin is the top-left of the bounding box. The square body occupies
/// `[0, size] x [tab, tab + size]`; one round tab sticks out of the top edge
/// and one out of the right edge, so the bounding box is `extent x extent`.
#[derive(Clone, Debug, PartialEq)]
pub struct PieceShape {
    size: u32,
    tab: u32,
    extent: u32,
    path: BezPath,
}

impl PieceShape {
    /// Edge length of the square body.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// How far the tabs reach past the body.
    pub fn tab(&self) -> u32 {
        self.tab
    }

    /// Edge length of the square bounding box (`size + tab`).
    pub fn extent(&self) -> u32 {
        self.extent
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// Non-zero winding test in local coordinates.
    pub fn contains(&self, p: Point) -> bool {
        self.path.contains(p)
    }

    /// Outline flattened to line segments.
    pub fn outline_segments(&self) -> Vec<Line> {
        let mut segments = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        kurbo::flatten(&self.path, FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                segments.push(Line::new(last, p));
                last = p;
            }
            PathEl::ClosePath => {
                if last != start {
                    segments.push(Line::new(last, start));
                }
                last = start;
            }
            // flatten only emits the three variants above
            PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                segments.push(Line::new(last, p));
                last = p;
            }
        });
        segments
    }
}

/// Builds [`PieceShape`]s. No randomness: the same size always yields the
/// same outline, so the notch and the floating piece match exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct PieceShapeGenerator;

impl PieceShapeGenerator {
    pub fn generate(&self, size: u32) -> CaptchaResult<PieceShape> {
        if size == 0 {
            return Err(CaptchaError::invalid_size("piece size must be > 0"));
        }

        let tab = ((f64::from(size) * TAB_RATIO).round() as u32).max(1);
        let extent = size.checked_add(tab).ok_or_else(|| {
            CaptchaError::invalid_size(format!("piece size {size} overflows with its tabs"))
        })?;
        let s = f64::from(size);
        let t = f64::from(tab);
        let w = s * NECK_RATIO;

        let mut path = BezPath::new();
        path.move_to((0.0, t));

        // top edge, tab bulging up towards y = 0
        let cx = s / 2.0;
        let (a, b) = (cx - w / 2.0, cx + w / 2.0);
        path.line_to((a, t));
        path.curve_to(
            (a - w * 0.25, t - t * 0.55),
            (cx - w * 0.6, 0.0),
            (cx, 0.0),
        );
        path.curve_to(
            (cx + w * 0.6, 0.0),
            (b + w * 0.25, t - t * 0.55),
            (b, t),
        );
        path.line_to((s, t));

        // right edge, tab bulging right towards x = s + t
        let cy = t + s / 2.0;
        let (a, b) = (cy - w / 2.0, cy + w / 2.0);
        path.line_to((s, a));
        path.curve_to(
            (s + t * 0.55, a - w * 0.25),
            (s + t, cy - w * 0.6),
            (s + t, cy),
        );
        path.curve_to(
            (s + t, cy + w * 0.6),
            (s + t * 0.55, b + w * 0.25),
            (s, b),
        );
        path.line_to((s, t + s));

        path.line_to((0.0, t + s));
        path.close_path();

        Ok(PieceShape {
            size,
            tab,
            extent,
            path,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/shape.rs"]
mod tests;
