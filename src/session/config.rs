use std::path::Path;

use crate::{
    foundation::error::{CaptchaError, CaptchaResult},
    geometry::placement::{PlacementStrategy, RandomPlacement},
    interaction::drag::{DEFAULT_ARM_THRESHOLD, PROGRESS_MAX},
    interaction::verify::DEFAULT_TOLERANCE,
};

/// How drag input reaches the engine.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// A slider control reports progress in `0..=100`.
    #[default]
    Slider,
    /// The user drags the piece itself; the host reports pointer x in pixels.
    Touch,
}

/// Construction-time settings of a captcha instance.
///
/// Every field has a default, so JSON configs may name only what they change.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Edge of the square piece body, in pixels.
    pub piece_size: u32,
    /// Alignment window, in pixels.
    pub tolerance: f64,
    /// Minimum distance between the piece and the surface edges.
    pub margin: u32,
    /// Largest slider progress at which a drag may start.
    pub arm_threshold: u8,
    pub mode: InputMode,
    /// Mixed with the image fingerprint to pick the placement.
    pub seed: u64,
    /// Vertical jitter of the default placement strategy.
    pub vertical_jitter: u32,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            piece_size: 50,
            tolerance: DEFAULT_TOLERANCE,
            margin: 10,
            arm_threshold: DEFAULT_ARM_THRESHOLD,
            mode: InputMode::Slider,
            seed: 0,
            vertical_jitter: 0,
        }
    }
}

impl CaptchaConfig {
    pub fn validate(&self) -> CaptchaResult<()> {
        if self.piece_size == 0 {
            return Err(CaptchaError::invalid_size("piece_size must be > 0"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CaptchaError::invalid_configuration(format!(
                "tolerance must be a finite value >= 0, got {}",
                self.tolerance
            )));
        }
        if self.arm_threshold > PROGRESS_MAX {
            return Err(CaptchaError::invalid_configuration(format!(
                "arm_threshold must be <= {PROGRESS_MAX}, got {}",
                self.arm_threshold
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> CaptchaResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CaptchaError::invalid_configuration(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> CaptchaResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CaptchaError::invalid_configuration(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// The placement strategy used when the host does not supply one.
    pub fn default_strategy(&self) -> Box<dyn PlacementStrategy> {
        Box::new(RandomPlacement::new(self.vertical_jitter))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
