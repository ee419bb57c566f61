//! Bearer-token session management.
//!
//! One live token per player: issuing a new token unconditionally replaces
//! that player's previous one. Lookup is O(1) both by token value and by
//! player id; the two views are kept consistent by updating them under one
//! guard as a single logical operation. Expiry is lazy: an expired entry is
//! purged when a lookup finds it, no background sweep runs.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use kakehashi_shared::time::Clock;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LENGTH: usize = 16;

/// A session token issued to an authenticated player.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub value: String,
    pub player_id: Uuid,
    pub issued_at: i64,
    /// `None` means the token never expires.
    pub expires_at: Option<i64>,
}

#[derive(Default)]
struct TokenStore {
    by_value: HashMap<String, SessionToken>,
    by_player: HashMap<Uuid, String>,
}

/// Manages session tokens for authenticated players.
pub struct TokenManager {
    ttl_seconds: i64,
    clock: Arc<dyn Clock>,
    store: Mutex<TokenStore>,
}

impl TokenManager {
    /// Create a token manager.
    ///
    /// # Arguments
    ///
    /// * `ttl_seconds` - Token lifetime; zero or negative means tokens never expire
    /// * `clock` - Clock used for issuance and expiry checks
    pub fn new(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl_seconds,
            clock,
            store: Mutex::new(TokenStore::default()),
        }
    }

    /// Issue a new token for a player, invalidating any existing one.
    pub async fn issue(&self, player_id: Uuid) -> String {
        let now = self.clock.now_millis();
        let expires_at = (self.ttl_seconds > 0).then(|| now + self.ttl_seconds * 1000);
        let value = generate_token_value();

        let token = SessionToken {
            value: value.clone(),
            player_id,
            issued_at: now,
            expires_at,
        };

        let mut store = self.store.lock().await;
        // Remove the old mapping before inserting the new one so the
        // one-token-per-player invariant holds at every point.
        if let Some(old_value) = store.by_player.remove(&player_id) {
            store.by_value.remove(&old_value);
        }
        store.by_value.insert(value.clone(), token);
        store.by_player.insert(player_id, value.clone());

        value
    }

    /// Resolve a token value to its player id.
    ///
    /// Returns `None` if the token is unknown or expired. An expired entry
    /// found here is purged as a side effect.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let mut store = self.store.lock().await;
        let entry = store.by_value.get(token)?;
        let player_id = entry.player_id;

        if is_expired(entry, self.clock.now_millis()) {
            store.by_value.remove(token);
            store.by_player.remove(&player_id);
            return None;
        }

        Some(player_id)
    }

    /// Check whether a player currently holds a valid token.
    pub async fn is_authenticated(&self, player_id: Uuid) -> bool {
        let mut store = self.store.lock().await;
        let Some(value) = store.by_player.get(&player_id).cloned() else {
            return false;
        };
        let Some(entry) = store.by_value.get(&value) else {
            return false;
        };

        if is_expired(entry, self.clock.now_millis()) {
            store.by_value.remove(&value);
            store.by_player.remove(&player_id);
            return false;
        }

        true
    }

    /// Revoke a token by value. Idempotent.
    pub async fn revoke(&self, token: &str) {
        let mut store = self.store.lock().await;
        if let Some(entry) = store.by_value.remove(token) {
            store.by_player.remove(&entry.player_id);
        }
    }

    /// Revoke a player's current token, if any. Idempotent.
    pub async fn revoke_for_player(&self, player_id: Uuid) {
        let mut store = self.store.lock().await;
        if let Some(value) = store.by_player.remove(&player_id) {
            store.by_value.remove(&value);
        }
    }

    /// Drop every token.
    pub async fn revoke_all(&self) {
        let mut store = self.store.lock().await;
        store.by_value.clear();
        store.by_player.clear();
    }

    /// Snapshot of all player ids currently holding a token.
    ///
    /// Used by broadcast fan-out; expiry is not re-checked here, the send
    /// path verifies presence per player anyway.
    pub async fn authenticated_players(&self) -> Vec<Uuid> {
        let store = self.store.lock().await;
        store.by_player.keys().copied().collect()
    }
}

fn is_expired(token: &SessionToken, now: i64) -> bool {
    matches!(token.expires_at, Some(expiry) if now > expiry)
}

/// Generate a random 16-character token from the 62-symbol alphabet.
fn generate_token_value() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
