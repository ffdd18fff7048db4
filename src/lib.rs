//! Slide-to-verify jigsaw captcha engine.
//!
//! A [`Captcha`] cuts a jigsaw piece out of a source image at a placement
//! chosen by a [`PlacementStrategy`], renders the darkened notch and the
//! floating piece as two layers, and verifies where the user drops the piece:
//!
//! - build a [`CaptchaConfig`] (or load one from JSON)
//! - construct a [`Captcha`] from a decoded [`RasterSurface`], or acquire one
//!   asynchronously through [`Captcha::acquire`]
//! - forward slider or touch events and show the returned [`Notice`]
#![forbid(unsafe_code)]

pub mod assets;
pub mod foundation;
pub mod geometry;
pub mod interaction;
pub mod render;
pub mod session;

pub use crate::foundation::core::{BezPath, Extent, Point, Rect, Rgba8Premul};
pub use crate::foundation::error::{CaptchaError, CaptchaResult};

pub use crate::assets::decode::{decode_image, encode_png, load_image};
#[cfg(feature = "http")]
pub use crate::assets::fetch::HttpFetcher;
pub use crate::assets::fetch::{Acquisition, ImageFetcher, ImageSource};
pub use crate::assets::surface::RasterSurface;
pub use crate::geometry::placement::{
    FixedPlacement, Placement, PlacementRequest, PlacementStrategy, RandomPlacement,
};
pub use crate::geometry::shape::{PieceShape, PieceShapeGenerator};
pub use crate::interaction::clock::{Clock, ManualClock, SystemClock};
pub use crate::interaction::drag::{ArmOutcome, DragController, DragPhase, DragState, Release};
pub use crate::interaction::verify::{VerificationEngine, VerificationResult};
pub use crate::render::composite::{CaptchaLayers, MaskCompositor};
pub use crate::render::mask::{BORDER_PAD, BORDER_WIDTH, Coverage, PieceMask};
pub use crate::session::captcha::{Captcha, CaptchaListener, Notice, default_message};
pub use crate::session::config::{CaptchaConfig, InputMode};
