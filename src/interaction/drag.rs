/// Upper end of the normalized drag scale.
pub const PROGRESS_MAX: u8 = 100;

/// Default for "the drag must start near the origin", in progress units.
pub const DEFAULT_ARM_THRESHOLD: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DragPhase {
    Idle,
    Armed,
    Dragging,
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DragState {
    pub phase: DragPhase,
    /// Horizontal offset of the floating piece, in `[0, travel]`.
    pub current_x: f64,
    /// Clock reading of the first move after arming.
    pub start_time: Option<u64>,
}

impl DragState {
    pub const IDLE: Self = Self {
        phase: DragPhase::Idle,
        current_x: 0.0,
        start_time: None,
    };
}

/// Result of a down event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmOutcome {
    Armed,
    /// Started too far from the origin; the host should snap its control
    /// back to progress 0.
    Rejected,
    /// Not idle, or input is disabled.
    Ignored,
}

impl ArmOutcome {
    /// Progress value the host should echo back to its slider, if any.
    pub fn echo_progress(self) -> Option<u8> {
        match self {
            Self::Rejected => Some(0),
            Self::Armed | Self::Ignored => None,
        }
    }
}

/// Snapshot taken on the `Dragging -> Settled` transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Release {
    pub current_x: f64,
    pub start_ms: u64,
    pub release_ms: u64,
}

impl Release {
    pub fn elapsed_ms(&self) -> u64 {
        self.release_ms.saturating_sub(self.start_ms)
    }
}

/// Turns 1D drag input into the floating piece's x offset and runs the
/// `Idle -> Armed -> Dragging -> Settled` machine.
///
/// Input that arrives in a phase where it has no meaning is ignored rather
/// than reported as an error.
#[derive(Clone, Debug)]
pub struct DragController {
    travel: f64,
    arm_threshold: u8,
    enabled: bool,
    state: DragState,
    // pointer x minus piece x at touch-down
    touch_anchor: Option<f64>,
}

impl DragController {
    /// `travel` is how far the piece can move: surface width minus piece extent.
    pub fn new(travel: u32, arm_threshold: u8) -> Self {
        Self {
            travel: f64::from(travel),
            arm_threshold: arm_threshold.min(PROGRESS_MAX),
            enabled: true,
            state: DragState::IDLE,
            touch_anchor: None,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn phase(&self) -> DragPhase {
        self.state.phase
    }

    pub fn travel(&self) -> f64 {
        self.travel
    }

    pub fn arm_threshold(&self) -> u8 {
        self.arm_threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lock or unlock input. Disabling mid-drag drops back to idle.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled && matches!(self.state.phase, DragPhase::Armed | DragPhase::Dragging) {
            self.state = DragState::IDLE;
            self.touch_anchor = None;
        }
    }

    /// Map slider progress (clamped to 0..=100) to a piece offset.
    pub fn progress_to_x(&self, progress: u8) -> f64 {
        let p = f64::from(progress.min(PROGRESS_MAX)) / f64::from(PROGRESS_MAX);
        (p * self.travel).clamp(0.0, self.travel)
    }

    /// Slider down. Rejected when `initial_progress` exceeds the threshold.
    pub fn arm(&mut self, initial_progress: u8) -> ArmOutcome {
        if !self.enabled || self.state.phase != DragPhase::Idle {
            return ArmOutcome::Ignored;
        }
        if initial_progress > self.arm_threshold {
            tracing::debug!(initial_progress, threshold = self.arm_threshold, "arm rejected");
            return ArmOutcome::Rejected;
        }
        self.state = DragState {
            phase: DragPhase::Armed,
            current_x: 0.0,
            start_time: None,
        };
        tracing::debug!("drag armed");
        ArmOutcome::Armed
    }

    /// Touch down at pointer `x`; arms only when the pointer is on the piece.
    pub fn touch_down(&mut self, x: f64, piece_extent: f64) -> ArmOutcome {
        if !self.enabled || self.state.phase != DragPhase::Idle {
            return ArmOutcome::Ignored;
        }
        let left = self.state.current_x;
        if !(left..=left + piece_extent).contains(&x) {
            tracing::debug!(x, left, "touch outside piece");
            return ArmOutcome::Rejected;
        }
        self.touch_anchor = Some(x - left);
        self.state.phase = DragPhase::Armed;
        self.state.start_time = None;
        ArmOutcome::Armed
    }

    /// Slider progress. Returns the new offset when the update was applied.
    pub fn update(&mut self, progress: u8, now_ms: u64) -> Option<f64> {
        let x = self.progress_to_x(progress);
        self.move_to(x, now_ms)
    }

    /// Touch move to pointer `x`.
    pub fn touch_move(&mut self, x: f64, now_ms: u64) -> Option<f64> {
        let anchor = self.touch_anchor?;
        self.move_to(x - anchor, now_ms)
    }

    fn move_to(&mut self, x: f64, now_ms: u64) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        match self.state.phase {
            DragPhase::Armed => {
                self.state.phase = DragPhase::Dragging;
                self.state.start_time = Some(now_ms);
            }
            DragPhase::Dragging => {}
            DragPhase::Idle | DragPhase::Settled => return None,
        }
        self.state.current_x = x.clamp(0.0, self.travel);
        Some(self.state.current_x)
    }

    /// Slider/touch up. Only a drag that actually moved settles; releasing
    /// straight after arming returns to idle.
    pub fn release(&mut self, now_ms: u64) -> Option<Release> {
        self.touch_anchor = None;
        match self.state.phase {
            DragPhase::Dragging => {
                let start_ms = self.state.start_time.unwrap_or(now_ms);
                self.state.phase = DragPhase::Settled;
                tracing::debug!(x = self.state.current_x, "drag settled");
                Some(Release {
                    current_x: self.state.current_x,
                    start_ms,
                    release_ms: now_ms,
                })
            }
            DragPhase::Armed => {
                self.state = DragState::IDLE;
                None
            }
            DragPhase::Idle | DragPhase::Settled => None,
        }
    }

    /// Back to idle at offset 0, input re-enabled.
    pub fn reset(&mut self) {
        self.state = DragState::IDLE;
        self.touch_anchor = None;
        self.enabled = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interaction/drag.rs"]
mod tests;
