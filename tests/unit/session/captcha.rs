use std::sync::Mutex;

use super::*;
use crate::geometry::placement::FixedPlacement;
use crate::interaction::clock::ManualClock;
use crate::interaction::drag::DragPhase;
use crate::render::mask::BORDER_PAD;

fn textured(width: u32, height: u32) -> RasterSurface {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 251) as u8, (y % 241) as u8, (x ^ y) as u8 | 1, 255]);
        }
    }
    RasterSurface::from_straight_rgba8(width, height, data).unwrap()
}

fn fixed(x: u32, y: u32) -> Box<dyn PlacementStrategy> {
    Box::new(FixedPlacement::new(x, y))
}

fn captcha_at(x: u32, clock: &Arc<ManualClock>) -> Captcha {
    let clock: Arc<dyn Clock> = clock.clone();
    Captcha::new(CaptchaConfig::default(), fixed(x, 100), textured(300, 300))
        .unwrap()
        .with_clock(clock)
}

#[derive(Default)]
struct Recorded {
    successes: Vec<u64>,
    failures: usize,
    image_errors: Vec<String>,
}

struct Recorder(Arc<Mutex<Recorded>>);

impl CaptchaListener for Recorder {
    fn on_success(&mut self, elapsed_ms: u64) -> Option<String> {
        self.0.lock().unwrap().successes.push(elapsed_ms);
        Some(format!("ok {elapsed_ms}"))
    }

    fn on_failure(&mut self) -> Option<String> {
        self.0.lock().unwrap().failures += 1;
        None
    }

    fn on_image_error(&mut self, err: &CaptchaError) {
        self.0.lock().unwrap().image_errors.push(err.to_string());
    }
}

#[test]
fn construction_derives_layers() {
    let clock = Arc::new(ManualClock::new(0));
    let c = captcha_at(120, &clock);
    assert!(c.is_ready());
    assert_eq!(c.placement(), Some(Placement { x: 120, y: 100 }));
    let shape = c.shape().unwrap();
    assert_eq!((shape.size(), shape.extent()), (50, 60));
    assert_eq!(c.layers().unwrap().piece.width(), 60 + 2 * BORDER_PAD);
    assert_eq!(c.drag_state(), DragState::IDLE);
    assert_eq!(c.aligned_progress(), Some(50));
}

#[test]
fn too_small_surface_is_rejected() {
    let err = Captcha::with_defaults(CaptchaConfig::default(), textured(60, 60))
        .err()
        .unwrap();
    assert!(matches!(err, CaptchaError::InvalidConfiguration(_)));
}

#[test]
fn huge_piece_sizes_are_errors_not_panics() {
    let build = |piece_size| {
        let cfg = CaptchaConfig {
            piece_size,
            ..CaptchaConfig::default()
        };
        Captcha::with_defaults(cfg, textured(300, 300)).err().unwrap()
    };
    let err = build(u32::MAX);
    assert!(matches!(err, CaptchaError::InvalidSize(_)));
    assert!(err.is_construction_error());
    assert!(matches!(
        build(3_000_000_000),
        CaptchaError::InvalidConfiguration(_)
    ));

    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    assert!(matches!(
        c.set_piece_size(u32::MAX),
        Err(CaptchaError::InvalidSize(_))
    ));
    assert_eq!(c.shape().unwrap().size(), 50);
}

#[test]
fn strategy_outside_margins_is_invalid_geometry() {
    let err = Captcha::new(CaptchaConfig::default(), fixed(5, 100), textured(300, 300));
    assert!(err.is_err());

    struct Rogue;
    impl PlacementStrategy for Rogue {
        fn choose_placement(&self, _req: &PlacementRequest) -> CaptchaResult<Placement> {
            Ok(Placement { x: 290, y: 0 })
        }
    }
    let err = Captcha::new(CaptchaConfig::default(), Box::new(Rogue), textured(300, 300))
        .err()
        .unwrap();
    assert!(matches!(err, CaptchaError::InvalidGeometry(_)));
}

#[test]
fn aligned_release_succeeds_with_elapsed_time() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut c = captcha_at(120, &clock);

    assert_eq!(c.slider_down(0), ArmOutcome::Armed);
    clock.advance(10);
    assert_eq!(c.slider_progress(25), Some(60.0));
    for p in (20..=50).step_by(10) {
        clock.advance(10);
        c.slider_progress(p);
    }
    assert_eq!(c.piece_offset(), 120.0);
    clock.advance(5);
    let notice = c.slider_up().unwrap();
    assert_eq!(notice.result, VerificationResult::Success { elapsed_ms: 45 });
    assert_eq!(notice.message, "Verified in 45 ms");
    assert_eq!(c.last_result(), Some(notice.result));
    assert_eq!(c.drag_state().phase, DragPhase::Settled);
}

#[test]
fn misaligned_release_fails_and_locks_input_until_reset() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);

    c.slider_down(0);
    c.slider_progress(70);
    let notice = c.slider_up().unwrap();
    assert_eq!(notice.result, VerificationResult::Failure);
    assert_eq!(notice.message, "Verification failed, please try again");
    assert!(!c.is_input_enabled());
    assert_eq!(c.slider_down(0), ArmOutcome::Ignored);

    c.reset();
    assert!(c.is_input_enabled());
    assert_eq!(c.drag_state(), DragState::IDLE);
    assert_eq!(c.last_result(), None);
    assert_eq!(c.placement(), Some(Placement { x: 120, y: 100 }));
    assert_eq!(c.slider_down(5), ArmOutcome::Armed);
}

#[test]
fn arm_above_threshold_is_rejected() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    let out = c.slider_down(40);
    assert_eq!(out, ArmOutcome::Rejected);
    assert_eq!(out.echo_progress(), Some(0));
    assert_eq!(c.slider_progress(50), None);
    assert_eq!(c.slider_up(), None);
}

#[test]
fn listener_overrides_messages() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    let rec = Arc::new(Mutex::new(Recorded::default()));
    c.set_listener(Box::new(Recorder(rec.clone())));

    c.slider_down(0);
    c.slider_progress(49);
    clock.advance(300);
    c.slider_progress(51);
    let notice = c.slider_up().unwrap();
    assert_eq!(notice.message, "ok 300");

    c.reset();
    c.slider_down(0);
    c.slider_progress(100);
    let notice = c.slider_up().unwrap();
    assert_eq!(notice.message, default_message(VerificationResult::Failure));

    let rec = rec.lock().unwrap();
    assert_eq!(rec.successes, vec![300]);
    assert_eq!(rec.failures, 1);
}

#[test]
fn events_of_the_other_mode_are_ignored() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    assert_eq!(c.touch_down(10.0), ArmOutcome::Ignored);

    c.set_mode(InputMode::Touch).unwrap();
    assert_eq!(c.slider_down(0), ArmOutcome::Ignored);
    assert_eq!(c.touch_down(200.0), ArmOutcome::Rejected);
    assert_eq!(c.touch_down(30.0), ArmOutcome::Armed);
    assert_eq!(c.touch_move(150.0), Some(120.0));
    clock.advance(80);
    c.touch_move(151.0);
    let notice = c.touch_up().unwrap();
    assert!(notice.result.is_success());
}

#[test]
fn rejected_setter_keeps_previous_state() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);

    assert!(matches!(c.set_piece_size(0), Err(CaptchaError::InvalidSize(_))));
    // extent 240 does not fit a 300px surface with the fixed x
    assert!(c.set_piece_size(200).is_err());
    assert_eq!(c.config().piece_size, 50);
    assert_eq!(c.shape().unwrap().size(), 50);
    assert!(c.set_tolerance(f64::NAN).is_err());
    assert_eq!(c.config().tolerance, 5.0);
}

#[test]
fn setters_rederive_and_reset() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    c.slider_down(0);
    c.slider_progress(30);

    c.set_piece_size(40).unwrap();
    assert_eq!(c.shape().unwrap().extent(), 48);
    assert_eq!(c.drag_state(), DragState::IDLE);

    c.set_strategy(fixed(30, 30)).unwrap();
    assert_eq!(c.placement(), Some(Placement { x: 30, y: 30 }));

    c.set_tolerance(0.0).unwrap();
    c.slider_down(0);
    c.slider_progress(1);
    let notice = c.slider_up().unwrap();
    assert_eq!(notice.result, VerificationResult::Failure);
}

#[test]
fn seed_changes_default_placement_deterministically() {
    let make = |seed| {
        let cfg = CaptchaConfig {
            seed,
            ..CaptchaConfig::default()
        };
        Captcha::with_defaults(cfg, textured(320, 200))
            .unwrap()
            .placement()
            .unwrap()
    };
    assert_eq!(make(7), make(7));
    let xs: std::collections::HashSet<u32> = (0..16).map(|s| make(s).x).collect();
    assert!(xs.len() > 1);
}

#[test]
fn render_frame_tracks_the_drag() {
    let clock = Arc::new(ManualClock::new(0));
    let mut c = captcha_at(120, &clock);
    let layers = c.layers().unwrap().clone();
    assert_eq!(c.render_frame().unwrap(), layers.compose_frame(0).unwrap());

    c.slider_down(0);
    c.slider_progress(50);
    let frame = c.render_frame().unwrap();
    assert_eq!(frame, layers.compose_frame(120).unwrap());
    // inside the shape the frame shows the source again
    let source = c.source().unwrap();
    let mask = layers.mask();
    for cy in 0..mask.canvas() {
        for cx in 0..mask.canvas() {
            if mask.is_inside(cx, cy) {
                let (x, y) = (120 + cx - mask.pad(), 100 + cy - mask.pad());
                assert_eq!(frame.pixel(x, y), source.pixel(x, y));
            }
        }
    }
}

#[test]
fn pending_instance_is_inert() {
    let mut c = Captcha::pending(CaptchaConfig::default(), fixed(10, 10)).unwrap();
    assert!(!c.is_ready());
    assert_eq!(c.slider_down(0), ArmOutcome::Ignored);
    assert_eq!(c.slider_up(), None);
    assert!(c.render_frame().is_err());
    c.set_piece_size(30).unwrap();
    c.set_surface(textured(100, 100)).unwrap();
    assert!(c.is_ready());
}

#[tokio::test]
async fn acquisition_installs_surface() {
    let mut c = Captcha::pending(CaptchaConfig::default(), fixed(20, 20)).unwrap();
    c.acquire(ImageSource::Raster(textured(200, 120)), None);
    assert!(c.has_pending_acquisition());
    assert!(!c.is_ready());
    c.complete_acquisition().await.unwrap();
    assert!(c.is_ready());
    assert_eq!(c.source().unwrap().width(), 200);
    assert!(!c.has_pending_acquisition());
}

#[tokio::test]
async fn acquisition_errors_reach_the_listener() {
    let mut c = Captcha::pending(CaptchaConfig::default(), fixed(20, 20)).unwrap();
    let rec = Arc::new(Mutex::new(Recorded::default()));
    c.set_listener(Box::new(Recorder(rec.clone())));

    c.acquire(ImageSource::Bytes(b"not an image".to_vec()), None);
    let err = c.complete_acquisition().await.unwrap_err();
    assert!(matches!(err, CaptchaError::ImageAcquisitionFailed(_)));
    assert!(!c.is_ready());
    assert_eq!(c.slider_down(0), ArmOutcome::Ignored);
    assert_eq!(rec.lock().unwrap().image_errors.len(), 1);

    // small image: decodes but cannot hold the piece
    c.acquire(ImageSource::Raster(textured(40, 40)), None);
    assert!(c.complete_acquisition().await.is_err());
    assert_eq!(rec.lock().unwrap().image_errors.len(), 2);
}

#[tokio::test]
async fn complete_without_acquire_is_cancelled() {
    let mut c = Captcha::pending(CaptchaConfig::default(), fixed(20, 20)).unwrap();
    assert!(matches!(
        c.complete_acquisition().await,
        Err(CaptchaError::CancelledAcquisition(_))
    ));
}
