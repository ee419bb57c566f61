//! Seam to the host game.
//!
//! The relay core never talks to the game engine directly; it goes through
//! [`GameAdapter`]. A player is "present" exactly when the adapter can name
//! it. [`InMemoryGame`] backs the standalone binary and the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Boundary between the relay core and the host game.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameAdapter: Send + Sync {
    /// Display name of the player, or `None` if the player is not present
    /// in the game right now.
    async fn player_name(&self, player_id: Uuid) -> Option<String>;

    /// Push a formatted chat line into the player's game chat.
    async fn deliver_chat(&self, player_id: Uuid, line: String);

    /// Run a command (without leading slash) as the given player on the
    /// game's native command path.
    async fn dispatch_command(&self, player_id: Uuid, command: String);
}

/// Adapter backed by an in-memory roster; stands in for a real game server.
///
/// Records deliveries and dispatched commands so tests and the standalone
/// binary can observe fan-out.
pub struct InMemoryGame {
    roster: Mutex<HashMap<Uuid, String>>,
    deliveries: Mutex<Vec<(Uuid, String)>>,
    commands: Mutex<Vec<(Uuid, String)>>,
}

impl InMemoryGame {
    pub fn new() -> Self {
        Self {
            roster: Mutex::new(HashMap::new()),
            deliveries: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Mark a player as present in the game.
    pub async fn add_player(&self, player_id: Uuid, name: impl Into<String>) {
        let mut roster = self.roster.lock().await;
        roster.insert(player_id, name.into());
    }

    /// Mark a player as having left the game.
    pub async fn remove_player(&self, player_id: Uuid) {
        let mut roster = self.roster.lock().await;
        roster.remove(&player_id);
    }

    /// Chat lines delivered so far, in delivery order.
    pub async fn deliveries(&self) -> Vec<(Uuid, String)> {
        self.deliveries.lock().await.clone()
    }

    /// Commands dispatched so far, in dispatch order.
    pub async fn dispatched_commands(&self) -> Vec<(Uuid, String)> {
        self.commands.lock().await.clone()
    }
}

impl Default for InMemoryGame {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameAdapter for InMemoryGame {
    async fn player_name(&self, player_id: Uuid) -> Option<String> {
        let roster = self.roster.lock().await;
        roster.get(&player_id).cloned()
    }

    async fn deliver_chat(&self, player_id: Uuid, line: String) {
        tracing::debug!("deliver to {}: {}", player_id, line);
        let mut deliveries = self.deliveries.lock().await;
        deliveries.push((player_id, line));
    }

    async fn dispatch_command(&self, player_id: Uuid, command: String) {
        tracing::info!("dispatching command as {}: /{}", player_id, command);
        let mut commands = self.commands.lock().await;
        commands.push((player_id, command));
    }
}
