//! Server configuration.

use crate::auth::CaptchaKind;

/// Password the server ships with; using it in production is warned against.
pub const DEFAULT_PASSWORD: &str = "changeme";

/// Runtime configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared secret clients must present on `/api/auth`.
    pub password: String,
    /// Captcha provider gating authentication.
    pub captcha: CaptchaKind,
    /// Capacity of the message history buffer.
    pub history_size: usize,
    /// Token lifetime in seconds; zero or negative disables expiry.
    pub token_expiry_seconds: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            password: DEFAULT_PASSWORD.to_string(),
            captcha: CaptchaKind::None,
            history_size: 100,
            token_expiry_seconds: 3600,
        }
    }
}
