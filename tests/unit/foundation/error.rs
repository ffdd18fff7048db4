use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CaptchaError::invalid_size("x")
            .to_string()
            .contains("invalid size error:")
    );
    assert!(
        CaptchaError::invalid_configuration("x")
            .to_string()
            .contains("invalid configuration error:")
    );
    assert!(
        CaptchaError::invalid_geometry("x")
            .to_string()
            .contains("invalid geometry error:")
    );
    assert!(
        CaptchaError::acquisition_failed("x")
            .to_string()
            .contains("image acquisition error:")
    );
    assert!(
        CaptchaError::cancelled("x")
            .to_string()
            .contains("cancelled acquisition:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CaptchaError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn construction_family_is_classified() {
    assert!(CaptchaError::invalid_size("x").is_construction_error());
    assert!(CaptchaError::invalid_configuration("x").is_construction_error());
    assert!(CaptchaError::invalid_geometry("x").is_construction_error());
    assert!(!CaptchaError::acquisition_failed("x").is_construction_error());
    assert!(!CaptchaError::cancelled("x").is_construction_error());
}
