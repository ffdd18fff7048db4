/// Convenience result type used across slidecap.
pub type CaptchaResult<T> = Result<T, CaptchaError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Verification outcomes are not errors: a wrong guess is a
/// [`crate::VerificationResult::Failure`], never a `CaptchaError`.
#[derive(thiserror::Error, Debug)]
pub enum CaptchaError {
    /// Non-positive piece size.
    #[error("invalid size error: {0}")]
    InvalidSize(String),

    /// Configuration that admits no valid placement or is out of range.
    #[error("invalid configuration error: {0}")]
    InvalidConfiguration(String),

    /// Piece geometry that does not fit inside the source surface.
    #[error("invalid geometry error: {0}")]
    InvalidGeometry(String),

    /// Fetch or decode failure from the external image source.
    #[error("image acquisition error: {0}")]
    ImageAcquisitionFailed(String),

    /// Fetch abandoned because its owner was torn down.
    #[error("cancelled acquisition: {0}")]
    CancelledAcquisition(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptchaError {
    /// Build a [`CaptchaError::InvalidSize`] value.
    pub fn invalid_size(msg: impl Into<String>) -> Self {
        Self::InvalidSize(msg.into())
    }

    /// Build a [`CaptchaError::InvalidConfiguration`] value.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Build a [`CaptchaError::InvalidGeometry`] value.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Build a [`CaptchaError::ImageAcquisitionFailed`] value.
    pub fn acquisition_failed(msg: impl Into<String>) -> Self {
        Self::ImageAcquisitionFailed(msg.into())
    }

    /// Build a [`CaptchaError::CancelledAcquisition`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::CancelledAcquisition(msg.into())
    }

    /// Whether this error belongs to the construction-time family that is
    /// fatal to building a captcha instance.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSize(_) | Self::InvalidConfiguration(_) | Self::InvalidGeometry(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
