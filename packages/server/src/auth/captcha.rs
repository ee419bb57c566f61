//! Captcha providers gating the authentication handshake.
//!
//! A challenge is ephemeral, per player and single use: any validation
//! attempt consumes it, so a wrong answer forces the request handler to
//! generate a fresh challenge rather than retry the old one.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Which captcha provider the server is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaKind {
    /// Authentication is not captcha-gated.
    None,
    /// Built-in arithmetic challenge.
    SimpleMath,
    /// External anti-bot service. Not wired up yet; falls back to
    /// the arithmetic challenge.
    External,
}

impl FromStr for CaptchaKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" => CaptchaKind::None,
            "external" | "nantibot" | "captcha-api" => CaptchaKind::External,
            // Unknown provider names get the built-in challenge.
            _ => CaptchaKind::SimpleMath,
        })
    }
}

impl CaptchaKind {
    /// Build the provider for this kind.
    pub fn provider(self) -> Box<dyn CaptchaProvider> {
        match self {
            CaptchaKind::None => Box::new(NoCaptcha),
            CaptchaKind::SimpleMath => Box::new(SimpleMathCaptcha::new()),
            CaptchaKind::External => Box::new(ExternalCaptcha::new()),
        }
    }
}

/// Pluggable captcha capability consulted by the request handler.
#[async_trait]
pub trait CaptchaProvider: Send + Sync {
    /// Whether authentication must be captcha-gated at all.
    fn required(&self) -> bool {
        true
    }

    /// Create a fresh challenge for the player, replacing any pending one.
    /// Returns the challenge payload shown to the user.
    async fn challenge(&self, player_id: Uuid) -> Option<String>;

    /// Validate and consume the pending challenge for the player.
    /// Consumes the challenge whether or not the answer matches.
    async fn validate(&self, player_id: Uuid, answer: &str) -> bool;
}

/// Provider used when no captcha is configured.
pub struct NoCaptcha;

#[async_trait]
impl CaptchaProvider for NoCaptcha {
    fn required(&self) -> bool {
        false
    }

    async fn challenge(&self, _player_id: Uuid) -> Option<String> {
        None
    }

    async fn validate(&self, _player_id: Uuid, _answer: &str) -> bool {
        true
    }
}

/// Arithmetic challenge: "What is a + b?" with a, b in 1..=10.
pub struct SimpleMathCaptcha {
    pending: Mutex<HashMap<Uuid, String>>,
}

impl SimpleMathCaptcha {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for SimpleMathCaptcha {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptchaProvider for SimpleMathCaptcha {
    async fn challenge(&self, player_id: Uuid) -> Option<String> {
        let (a, b) = {
            let mut rng = rand::rng();
            (rng.random_range(1..=10), rng.random_range(1..=10))
        };
        let answer = (a + b).to_string();

        let mut pending = self.pending.lock().await;
        pending.insert(player_id, answer);

        Some(format!("What is {} + {}?", a, b))
    }

    async fn validate(&self, player_id: Uuid, answer: &str) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.remove(&player_id) {
            Some(expected) => expected == answer.trim(),
            None => false,
        }
    }
}

/// Placeholder for an external anti-bot integration.
///
/// TODO: call out to the external provider's API once one is deployed;
/// until then every operation delegates to the arithmetic challenge.
pub struct ExternalCaptcha {
    fallback: SimpleMathCaptcha,
}

impl ExternalCaptcha {
    pub fn new() -> Self {
        Self {
            fallback: SimpleMathCaptcha::new(),
        }
    }
}

impl Default for ExternalCaptcha {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptchaProvider for ExternalCaptcha {
    async fn challenge(&self, player_id: Uuid) -> Option<String> {
        tracing::debug!("External captcha provider not wired up, using arithmetic challenge");
        self.fallback.challenge(player_id).await
    }

    async fn validate(&self, player_id: Uuid, answer: &str) -> bool {
        self.fallback.validate(player_id, answer).await
    }
}
