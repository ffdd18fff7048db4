use crate::{
    foundation::error::{CaptchaError, CaptchaResult},
    geometry::placement::Placement,
    interaction::drag::Release,
};

/// Default alignment window, in pixels.
pub const DEFAULT_TOLERANCE: f64 = 5.0;

/// Outcome of one completed drag. Produced once per release and never
/// mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationResult {
    Success { elapsed_ms: u64 },
    Failure,
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Decides pass/fail on release.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerificationEngine {
    tolerance: f64,
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl VerificationEngine {
    pub fn new(tolerance: f64) -> CaptchaResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(CaptchaError::invalid_configuration(format!(
                "tolerance must be a finite value >= 0, got {tolerance}"
            )));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether `current_x` is within tolerance of the target column.
    pub fn is_aligned(&self, current_x: f64, placement: Placement) -> bool {
        (current_x - f64::from(placement.x)).abs() <= self.tolerance
    }

    pub fn evaluate(&self, release: &Release, placement: Placement) -> VerificationResult {
        let result = if self.is_aligned(release.current_x, placement) {
            VerificationResult::Success {
                elapsed_ms: release.elapsed_ms(),
            }
        } else {
            VerificationResult::Failure
        };
        tracing::debug!(
            current_x = release.current_x,
            target_x = placement.x,
            tolerance = self.tolerance,
            ?result,
            "verified release"
        );
        result
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interaction/verify.rs"]
mod tests;
