//! Client session state.
//!
//! One mutex guards the whole session so every mutation happens in a single
//! logical context; completion handlers never race each other on it. The
//! relay-enabled flag is independent of the connection state machine.

use tokio::sync::Mutex;
use uuid::Uuid;

/// Connection state machine:
/// `Disconnected → Authenticating → {CaptchaPending → Authenticating} →
/// Connected → Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Authenticating,
    CaptchaPending,
    Connected,
}

#[derive(Debug)]
struct SessionInner {
    phase: SessionPhase,
    relay_enabled: bool,
    in_game: bool,
    url: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

/// Shared session state consulted by the gate, the poller and the API client.
pub struct Session {
    player_id: Uuid,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(player_id: Uuid) -> Self {
        Self {
            player_id,
            inner: Mutex::new(SessionInner {
                phase: SessionPhase::Disconnected,
                relay_enabled: false,
                in_game: true,
                url: None,
                password: None,
                token: None,
            }),
        }
    }

    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    pub async fn set_phase(&self, phase: SessionPhase) {
        self.inner.lock().await.phase = phase;
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.phase == SessionPhase::Connected
    }

    pub async fn relay_enabled(&self) -> bool {
        self.inner.lock().await.relay_enabled
    }

    pub async fn set_relay_enabled(&self, enabled: bool) {
        self.inner.lock().await.relay_enabled = enabled;
        if enabled {
            tracing::info!("Relay Mode enabled - chat will be redirected to the relay");
        } else {
            tracing::info!("Relay Mode disabled - chat will be sent normally");
        }
    }

    /// Whether the local player is present in the game.
    pub async fn in_game(&self) -> bool {
        self.inner.lock().await.in_game
    }

    pub async fn set_in_game(&self, in_game: bool) {
        self.inner.lock().await.in_game = in_game;
    }

    /// All three conditions a poll tick requires: connected, relay enabled
    /// and local player present.
    pub async fn poll_allowed(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.phase == SessionPhase::Connected && inner.relay_enabled && inner.in_game
    }

    pub async fn url(&self) -> Option<String> {
        self.inner.lock().await.url.clone()
    }

    pub async fn password(&self) -> Option<String> {
        self.inner.lock().await.password.clone()
    }

    pub async fn set_credentials(&self, url: String, password: String) {
        let mut inner = self.inner.lock().await;
        inner.url = Some(url);
        inner.password = Some(password);
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.lock().await.token.clone()
    }

    pub async fn set_token(&self, token: Option<String>) {
        self.inner.lock().await.token = token;
    }

    /// Transition into the connected state with a fresh token.
    pub async fn mark_connected(&self, token: String) {
        let mut inner = self.inner.lock().await;
        inner.token = Some(token);
        inner.phase = SessionPhase::Connected;
        inner.relay_enabled = true;
    }

    /// Drop the session back to disconnected, clearing the token.
    pub async fn mark_disconnected(&self) {
        let mut inner = self.inner.lock().await;
        inner.token = None;
        inner.phase = SessionPhase::Disconnected;
        inner.relay_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_session_starts_disconnected() {
        // テスト項目: 新規セッションは未接続でリレー無効
        // given (前提条件):
        let session = Session::new(Uuid::new_v4());

        // when (操作) / then (期待する結果):
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
        assert!(!session.relay_enabled().await);
        assert!(!session.poll_allowed().await);
    }

    #[tokio::test]
    async fn test_mark_connected_enables_polling() {
        // テスト項目: 接続完了でトークンが保持されポーリング条件が揃う
        // given (前提条件):
        let session = Session::new(Uuid::new_v4());

        // when (操作):
        session.mark_connected("token-abc".to_string()).await;

        // then (期待する結果):
        assert_eq!(session.phase().await, SessionPhase::Connected);
        assert_eq!(session.token().await.as_deref(), Some("token-abc"));
        assert!(session.poll_allowed().await);
    }

    #[tokio::test]
    async fn test_mark_disconnected_clears_token_and_relay() {
        // テスト項目: 切断でトークンとリレーフラグが消える
        // given (前提条件):
        let session = Session::new(Uuid::new_v4());
        session.mark_connected("token-abc".to_string()).await;

        // when (操作):
        session.mark_disconnected().await;

        // then (期待する結果):
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
        assert_eq!(session.token().await, None);
        assert!(!session.relay_enabled().await);
    }

    #[tokio::test]
    async fn test_poll_requires_player_in_game() {
        // テスト項目: ゲーム外に居る間はポーリング条件が満たされない
        // given (前提条件):
        let session = Session::new(Uuid::new_v4());
        session.mark_connected("token-abc".to_string()).await;

        // when (操作):
        session.set_in_game(false).await;

        // then (期待する結果):
        assert!(!session.poll_allowed().await);
    }
}
