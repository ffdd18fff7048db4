pub mod captcha;
pub mod config;
