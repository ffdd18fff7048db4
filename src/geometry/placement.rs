use std::ops::RangeInclusive;

use crate::{
    foundation::error::{CaptchaError, CaptchaResult},
    foundation::math::SplitMix64,
};

/// Target position of the notch: top-left of the piece's bounding box, in
/// source-surface pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
}

/// Everything a strategy needs to pick a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementRequest {
    pub surface_width: u32,
    pub surface_height: u32,
    /// Bounding-box edge of the piece, tabs included.
    pub piece_extent: u32,
    pub margin: u32,
    /// Derived from the source image and the configured seed.
    pub seed: u64,
}

impl PlacementRequest {
    /// Valid range of `Placement::x`.
    pub fn x_range(&self) -> CaptchaResult<RangeInclusive<u32>> {
        axis_range("width", self.surface_width, self.piece_extent, self.margin)
    }

    /// Valid range of `Placement::y`.
    pub fn y_range(&self) -> CaptchaResult<RangeInclusive<u32>> {
        axis_range("height", self.surface_height, self.piece_extent, self.margin)
    }

    /// Whether `p` keeps the whole piece inside the margins.
    pub fn admits(&self, p: Placement) -> CaptchaResult<bool> {
        Ok(self.x_range()?.contains(&p.x) && self.y_range()?.contains(&p.y))
    }
}

fn axis_range(
    axis: &str,
    surface: u32,
    extent: u32,
    margin: u32,
) -> CaptchaResult<RangeInclusive<u32>> {
    let needed = u64::from(extent) + 2 * u64::from(margin);
    if u64::from(surface) < needed {
        return Err(CaptchaError::invalid_configuration(format!(
            "surface {axis} {surface} is smaller than piece extent {extent} plus 2 * margin {margin}"
        )));
    }
    Ok(margin..=surface - margin - extent)
}

/// Picks where the notch goes. Swappable at construction time.
///
/// Implementations must return a placement admitted by
/// [`PlacementRequest::admits`]; the engine rejects anything else with
/// [`CaptchaError::InvalidGeometry`].
pub trait PlacementStrategy: Send + Sync {
    fn choose_placement(&self, req: &PlacementRequest) -> CaptchaResult<Placement>;
}

/// Default strategy: uniform x over the valid range, y centred with an
/// optional uniform jitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomPlacement {
    pub vertical_jitter: u32,
}

impl RandomPlacement {
    pub fn new(vertical_jitter: u32) -> Self {
        Self { vertical_jitter }
    }
}

impl PlacementStrategy for RandomPlacement {
    fn choose_placement(&self, req: &PlacementRequest) -> CaptchaResult<Placement> {
        let xs = req.x_range()?;
        let ys = req.y_range()?;
        let mut rng = SplitMix64::new(req.seed);

        let x = rng.range_inclusive(*xs.start(), *xs.end());

        let centre = i64::from((req.surface_height - req.piece_extent) / 2);
        let jitter = i64::from(rng.range_inclusive(0, self.vertical_jitter.saturating_mul(2)))
            - i64::from(self.vertical_jitter);
        let y = (centre + jitter).clamp(i64::from(*ys.start()), i64::from(*ys.end())) as u32;

        Ok(Placement { x, y })
    }
}

/// Always returns the same position, after checking it is admissible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPlacement {
    pub placement: Placement,
}

impl FixedPlacement {
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            placement: Placement { x, y },
        }
    }
}

impl PlacementStrategy for FixedPlacement {
    fn choose_placement(&self, req: &PlacementRequest) -> CaptchaResult<Placement> {
        if !req.admits(self.placement)? {
            return Err(CaptchaError::invalid_configuration(format!(
                "fixed placement ({}, {}) is outside x {:?}, y {:?}",
                self.placement.x,
                self.placement.y,
                req.x_range()?,
                req.y_range()?
            )));
        }
        Ok(self.placement)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/placement.rs"]
mod tests;
