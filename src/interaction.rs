pub mod clock;
pub mod drag;
pub mod verify;
