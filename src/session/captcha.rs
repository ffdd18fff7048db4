use std::sync::Arc;

use crate::{
    assets::fetch::{Acquisition, ImageFetcher, ImageSource},
    assets::surface::RasterSurface,
    foundation::error::{CaptchaError, CaptchaResult},
    geometry::placement::{Placement, PlacementRequest, PlacementStrategy},
    geometry::shape::{PieceShape, PieceShapeGenerator},
    interaction::clock::{Clock, SystemClock},
    interaction::drag::{ArmOutcome, DragController, DragState},
    interaction::verify::{VerificationEngine, VerificationResult},
    render::composite::{CaptchaLayers, MaskCompositor},
    session::config::{CaptchaConfig, InputMode},
};

/// Host-side notifications. Returning `None` from the verification hooks
/// keeps the default message.
pub trait CaptchaListener: Send {
    fn on_success(&mut self, _elapsed_ms: u64) -> Option<String> {
        None
    }

    fn on_failure(&mut self) -> Option<String> {
        None
    }

    /// Image acquisition failed or was cancelled; the instance stays un-armed.
    fn on_image_error(&mut self, _err: &CaptchaError) {}
}

/// What the host shows after a release.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Notice {
    pub result: VerificationResult,
    pub message: String,
}

pub fn default_message(result: VerificationResult) -> String {
    match result {
        VerificationResult::Success { elapsed_ms } => format!("Verified in {elapsed_ms} ms"),
        VerificationResult::Failure => "Verification failed, please try again".to_string(),
    }
}

#[derive(Clone, Debug)]
struct Derived {
    shape: PieceShape,
    layers: CaptchaLayers,
    drag: DragController,
    verifier: VerificationEngine,
}

/// One captcha instance: owns the active placement, layers and drag state.
///
/// All methods are called from the host's event loop, one at a time.
pub struct Captcha {
    config: CaptchaConfig,
    strategy: Box<dyn PlacementStrategy>,
    compositor: MaskCompositor,
    clock: Arc<dyn Clock>,
    listener: Option<Box<dyn CaptchaListener>>,
    source: Option<RasterSurface>,
    derived: Option<Derived>,
    last_result: Option<VerificationResult>,
    acquisition: Option<Acquisition>,
}

impl Captcha {
    /// Build an instance around an already-decoded source image.
    #[tracing::instrument(skip(strategy, source), fields(w = source.width(), h = source.height()))]
    pub fn new(
        config: CaptchaConfig,
        strategy: Box<dyn PlacementStrategy>,
        source: RasterSurface,
    ) -> CaptchaResult<Self> {
        let mut captcha = Self::pending(config, strategy)?;
        captcha.derived = Some(derive_layers(
            &captcha.config,
            captcha.strategy.as_ref(),
            &captcha.compositor,
            &source,
        )?);
        captcha.source = Some(source);
        Ok(captcha)
    }

    /// Like [`Captcha::new`] with the config's default placement strategy.
    pub fn with_defaults(config: CaptchaConfig, source: RasterSurface) -> CaptchaResult<Self> {
        let strategy = config.default_strategy();
        Self::new(config, strategy, source)
    }

    /// An instance without an image yet; see [`Captcha::acquire`].
    pub fn pending(
        config: CaptchaConfig,
        strategy: Box<dyn PlacementStrategy>,
    ) -> CaptchaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            strategy,
            compositor: MaskCompositor::default(),
            clock: Arc::new(SystemClock::default()),
            listener: None,
            source: None,
            derived: None,
            last_result: None,
            acquisition: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_compositor(mut self, compositor: MaskCompositor) -> CaptchaResult<Self> {
        self.compositor = compositor;
        self.rederive()?;
        Ok(self)
    }

    pub fn set_listener(&mut self, listener: Box<dyn CaptchaListener>) {
        self.listener = Some(listener);
    }

    pub fn config(&self) -> &CaptchaConfig {
        &self.config
    }

    pub fn mode(&self) -> InputMode {
        self.config.mode
    }

    /// Whether an image is installed and the layers are ready to draw.
    pub fn is_ready(&self) -> bool {
        self.derived.is_some()
    }

    pub fn source(&self) -> Option<&RasterSurface> {
        self.source.as_ref()
    }

    pub fn shape(&self) -> Option<&PieceShape> {
        self.derived.as_ref().map(|d| &d.shape)
    }

    pub fn layers(&self) -> Option<&CaptchaLayers> {
        self.derived.as_ref().map(|d| &d.layers)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.derived.as_ref().map(|d| d.layers.placement)
    }

    pub fn drag_state(&self) -> DragState {
        self.derived
            .as_ref()
            .map_or(DragState::IDLE, |d| d.drag.state())
    }

    /// Horizontal offset at which the host draws the piece layer.
    pub fn piece_offset(&self) -> f64 {
        self.drag_state().current_x
    }

    /// Slider progress that puts the piece exactly on the target, if any.
    pub fn aligned_progress(&self) -> Option<u8> {
        let d = self.derived.as_ref()?;
        let travel = d.drag.travel();
        if travel <= 0.0 {
            return Some(0);
        }
        let p = f64::from(d.layers.placement.x) / travel * 100.0;
        Some(p.round().clamp(0.0, 100.0) as u8)
    }

    /// Whether the host should accept drag input (false after a failure until
    /// [`Captcha::reset`]).
    pub fn is_input_enabled(&self) -> bool {
        self.derived.as_ref().is_some_and(|d| d.drag.is_enabled())
    }

    /// Outcome of the last completed attempt, until reset.
    pub fn last_result(&self) -> Option<VerificationResult> {
        self.last_result
    }

    /// Current frame: background plus the piece at its drag offset.
    pub fn render_frame(&self) -> CaptchaResult<RasterSurface> {
        let d = self.ready()?;
        d.layers
            .compose_frame(d.drag.state().current_x.round() as u32)
    }

    pub fn set_piece_size(&mut self, piece_size: u32) -> CaptchaResult<()> {
        self.update_config(|c| c.piece_size = piece_size)
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> CaptchaResult<()> {
        self.update_config(|c| c.tolerance = tolerance)
    }

    pub fn set_margin(&mut self, margin: u32) -> CaptchaResult<()> {
        self.update_config(|c| c.margin = margin)
    }

    pub fn set_arm_threshold(&mut self, arm_threshold: u8) -> CaptchaResult<()> {
        self.update_config(|c| c.arm_threshold = arm_threshold)
    }

    pub fn set_mode(&mut self, mode: InputMode) -> CaptchaResult<()> {
        self.update_config(|c| c.mode = mode)
    }

    pub fn set_seed(&mut self, seed: u64) -> CaptchaResult<()> {
        self.update_config(|c| c.seed = seed)
    }

    /// Swap the placement strategy; derives a fresh placement.
    pub fn set_strategy(&mut self, strategy: Box<dyn PlacementStrategy>) -> CaptchaResult<()> {
        if let Some(source) = &self.source {
            self.derived = Some(derive_layers(
                &self.config,
                strategy.as_ref(),
                &self.compositor,
                source,
            )?);
        }
        self.strategy = strategy;
        self.last_result = None;
        Ok(())
    }

    /// Install a new source image; derives a fresh placement.
    pub fn set_surface(&mut self, source: RasterSurface) -> CaptchaResult<()> {
        self.derived = Some(derive_layers(
            &self.config,
            self.strategy.as_ref(),
            &self.compositor,
            &source,
        )?);
        self.source = Some(source);
        self.last_result = None;
        Ok(())
    }

    // Applies the change only if the new config derives cleanly.
    fn update_config(&mut self, f: impl FnOnce(&mut CaptchaConfig)) -> CaptchaResult<()> {
        let mut config = self.config.clone();
        f(&mut config);
        config.validate()?;
        if let Some(source) = &self.source {
            self.derived = Some(derive_layers(
                &config,
                self.strategy.as_ref(),
                &self.compositor,
                source,
            )?);
        }
        self.config = config;
        self.last_result = None;
        Ok(())
    }

    fn rederive(&mut self) -> CaptchaResult<()> {
        if let Some(source) = &self.source {
            self.derived = Some(derive_layers(
                &self.config,
                self.strategy.as_ref(),
                &self.compositor,
                source,
            )?);
        }
        self.last_result = None;
        Ok(())
    }

    /// Slider down at `progress`.
    pub fn slider_down(&mut self, progress: u8) -> ArmOutcome {
        if self.config.mode != InputMode::Slider {
            return ArmOutcome::Ignored;
        }
        match self.derived.as_mut() {
            Some(d) => d.drag.arm(progress),
            None => ArmOutcome::Ignored,
        }
    }

    /// Slider moved. Returns the new piece offset when applied.
    pub fn slider_progress(&mut self, progress: u8) -> Option<f64> {
        if self.config.mode != InputMode::Slider {
            return None;
        }
        let now = self.clock.now_millis();
        self.derived.as_mut()?.drag.update(progress, now)
    }

    /// Slider released. Returns the notice to show when an attempt settled.
    pub fn slider_up(&mut self) -> Option<Notice> {
        if self.config.mode != InputMode::Slider {
            return None;
        }
        self.settle()
    }

    /// Pointer down at `x` (touch mode).
    pub fn touch_down(&mut self, x: f64) -> ArmOutcome {
        if self.config.mode != InputMode::Touch {
            return ArmOutcome::Ignored;
        }
        match self.derived.as_mut() {
            Some(d) => {
                let extent = f64::from(d.shape.extent());
                d.drag.touch_down(x, extent)
            }
            None => ArmOutcome::Ignored,
        }
    }

    /// Pointer moved to `x` (touch mode).
    pub fn touch_move(&mut self, x: f64) -> Option<f64> {
        if self.config.mode != InputMode::Touch {
            return None;
        }
        let now = self.clock.now_millis();
        self.derived.as_mut()?.drag.touch_move(x, now)
    }

    /// Pointer up (touch mode).
    pub fn touch_up(&mut self) -> Option<Notice> {
        if self.config.mode != InputMode::Touch {
            return None;
        }
        self.settle()
    }

    fn settle(&mut self) -> Option<Notice> {
        let now = self.clock.now_millis();
        let d = self.derived.as_mut()?;
        let release = d.drag.release(now)?;
        let result = d.verifier.evaluate(&release, d.layers.placement);
        if !result.is_success() {
            d.drag.set_enabled(false);
        }
        self.last_result = Some(result);

        let custom = match (self.listener.as_mut(), result) {
            (Some(l), VerificationResult::Success { elapsed_ms }) => l.on_success(elapsed_ms),
            (Some(l), VerificationResult::Failure) => l.on_failure(),
            (None, _) => None,
        };
        Some(Notice {
            result,
            message: custom.unwrap_or_else(|| default_message(result)),
        })
    }

    /// Back to idle at offset 0, input enabled, pending result dropped. The
    /// placement is kept; use a setter to re-derive it.
    pub fn reset(&mut self) {
        if let Some(d) = self.derived.as_mut() {
            d.drag.reset();
        }
        self.last_result = None;
        tracing::debug!("captcha reset");
    }

    /// Start loading a new source image in the background. Any in-flight
    /// acquisition is cancelled, and the instance stays un-armed until
    /// [`Captcha::complete_acquisition`] installs the result.
    pub fn acquire(&mut self, source: ImageSource, fetcher: Option<Arc<dyn ImageFetcher>>) {
        if let Some(mut prev) = self.acquisition.take() {
            prev.cancel();
        }
        self.source = None;
        self.derived = None;
        self.last_result = None;
        self.acquisition = Some(Acquisition::spawn(source, fetcher));
    }

    pub fn has_pending_acquisition(&self) -> bool {
        self.acquisition.is_some()
    }

    /// Await the in-flight acquisition and install its surface. Failures and
    /// cancellation go to the listener's `on_image_error` and are returned.
    pub async fn complete_acquisition(&mut self) -> CaptchaResult<()> {
        let acquisition = self
            .acquisition
            .take()
            .ok_or_else(|| CaptchaError::cancelled("no acquisition in flight"))?;
        let outcome = match acquisition.wait().await {
            Ok(surface) => self.set_surface(surface),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "image not installed");
            if let Some(l) = self.listener.as_mut() {
                l.on_image_error(e);
            }
        }
        outcome
    }

    /// Owner is going away: abandon any in-flight acquisition.
    pub fn teardown(&mut self) {
        if let Some(mut acquisition) = self.acquisition.take() {
            acquisition.cancel();
            tracing::debug!("cancelled in-flight acquisition on teardown");
        }
        if let Some(d) = self.derived.as_mut() {
            d.drag.reset();
        }
    }

    fn ready(&self) -> CaptchaResult<&Derived> {
        self.derived
            .as_ref()
            .ok_or_else(|| CaptchaError::invalid_configuration("no source image installed"))
    }
}

fn derive_layers(
    config: &CaptchaConfig,
    strategy: &dyn PlacementStrategy,
    compositor: &MaskCompositor,
    source: &RasterSurface,
) -> CaptchaResult<Derived> {
    let shape = PieceShapeGenerator.generate(config.piece_size)?;
    let request = PlacementRequest {
        surface_width: source.width(),
        surface_height: source.height(),
        piece_extent: shape.extent(),
        margin: config.margin,
        seed: source.fingerprint() ^ config.seed,
    };
    let placement = strategy.choose_placement(&request)?;
    if !request.admits(placement)? {
        return Err(CaptchaError::invalid_geometry(format!(
            "strategy placed the piece at ({}, {}), outside the surface margins",
            placement.x, placement.y
        )));
    }
    let layers = compositor.composite(source, &shape, placement)?;
    let drag = DragController::new(
        source.width().saturating_sub(shape.extent()),
        config.arm_threshold,
    );
    let verifier = VerificationEngine::new(config.tolerance)?;
    tracing::debug!(x = placement.x, y = placement.y, "derived captcha");
    Ok(Derived {
        shape,
        layers,
        drag,
        verifier,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/session/captcha.rs"]
mod tests;
