use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = CaptchaConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.piece_size, 50);
    assert_eq!(cfg.tolerance, 5.0);
    assert_eq!(cfg.arm_threshold, 10);
    assert_eq!(cfg.mode, InputMode::Slider);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = CaptchaConfig::from_json(r#"{"piece_size": 64, "mode": "touch"}"#).unwrap();
    assert_eq!(cfg.piece_size, 64);
    assert_eq!(cfg.mode, InputMode::Touch);
    assert_eq!(cfg.margin, 10);
    assert_eq!(cfg.tolerance, 5.0);
}

#[test]
fn json_roundtrip_preserves_fields() {
    let cfg = CaptchaConfig {
        piece_size: 42,
        tolerance: 2.5,
        margin: 3,
        arm_threshold: 0,
        mode: InputMode::Touch,
        seed: 77,
        vertical_jitter: 12,
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(CaptchaConfig::from_json(&json).unwrap(), cfg);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(
        CaptchaConfig::from_json(r#"{"piece_size": 0}"#),
        Err(CaptchaError::InvalidSize(_))
    ));
    assert!(matches!(
        CaptchaConfig::from_json(r#"{"tolerance": -1.0}"#),
        Err(CaptchaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        CaptchaConfig::from_json(r#"{"arm_threshold": 101}"#),
        Err(CaptchaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        CaptchaConfig::from_json(r#"{"piece_size": -5}"#),
        Err(CaptchaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        CaptchaConfig::from_json("{"),
        Err(CaptchaError::InvalidConfiguration(_))
    ));
}

#[test]
fn missing_config_file_is_reported() {
    let err = CaptchaConfig::load(Path::new("target/no/such/config.json")).unwrap_err();
    assert!(err.to_string().contains("read config"));
}
