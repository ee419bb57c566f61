//! Shared application state.

use std::sync::Arc;

use kakehashi_shared::time::Clock;

use crate::auth::{CaptchaProvider, TokenManager};
use crate::chat::ChatHistory;
use crate::config::ServerConfig;
use crate::game::GameAdapter;

/// State shared by all request handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub tokens: TokenManager,
    pub history: ChatHistory,
    pub captcha: Box<dyn CaptchaProvider>,
    pub game: Arc<dyn GameAdapter>,
}

impl AppState {
    /// Wire up the managers from a configuration and a game adapter.
    pub fn new(config: ServerConfig, game: Arc<dyn GameAdapter>, clock: Arc<dyn Clock>) -> Self {
        let tokens = TokenManager::new(config.token_expiry_seconds, clock.clone());
        let history = ChatHistory::new(config.history_size, clock);
        let captcha = config.captcha.provider();

        Self {
            config,
            tokens,
            history,
            captcha,
            game,
        }
    }
}
