//! Authentication: bearer-token sessions and captcha providers.

pub mod captcha;
pub mod token;

pub use captcha::{CaptchaKind, CaptchaProvider, NoCaptcha, SimpleMathCaptcha};
pub use token::TokenManager;
