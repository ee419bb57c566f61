//! The gate between outgoing chat and the relay.
//!
//! Every outgoing line gets exactly one of three routes: through to the
//! native path, blocked with a local notice, or relayed. Once a line is
//! relayed the native path stays suppressed no matter how the send turns
//! out; the user only ever sees a local echo or a local failure notice.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiClient;
use crate::display::DisplaySink;
use crate::formatter::MessageFormatter;
use crate::session::Session;

/// Name of the control command that is always left to the native path.
pub const RELAY_COMMAND: &str = "relay";

/// What the gate decided for an outgoing line. `Native` means the caller
/// must forward it to the native path itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Native,
    Blocked,
    Relayed,
}

/// Outbound send path, implemented by the API client.
#[async_trait]
pub trait RelaySender: Send + Sync {
    async fn send_message(&self, message: &str) -> bool;
}

#[async_trait]
impl RelaySender for ApiClient {
    async fn send_message(&self, message: &str) -> bool {
        ApiClient::send_message(self, message).await
    }
}

/// Decides, per outgoing chat line or command, between relay and native.
pub struct ChatGate {
    session: Arc<Session>,
    relay: Arc<dyn RelaySender>,
    sink: Arc<dyn DisplaySink>,
}

impl ChatGate {
    pub fn new(
        session: Arc<Session>,
        relay: Arc<dyn RelaySender>,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            session,
            relay,
            sink,
        }
    }

    /// Route an outgoing chat line.
    pub async fn handle_chat(&self, message: &str) -> GateDecision {
        if !self.session.relay_enabled().await {
            return GateDecision::Native;
        }

        if !self.session.is_connected().await {
            self.sink
                .show(MessageFormatter::format_notice(
                    "Not connected! Use /relay connect <url> <password>",
                ))
                .await;
            return GateDecision::Blocked;
        }

        // Fire and forget: the decision stands before the send completes.
        let relay = self.relay.clone();
        let sink = self.sink.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            relay_chat(relay, sink, message).await;
        });

        GateDecision::Relayed
    }

    /// Route an outgoing command (given without its leading slash).
    pub async fn handle_command(&self, command: &str) -> GateDecision {
        // The relay's own control command is never intercepted.
        if command.starts_with(RELAY_COMMAND) {
            return GateDecision::Native;
        }

        if self.session.relay_enabled().await && self.session.is_connected().await {
            let relay = self.relay.clone();
            let sink = self.sink.clone();
            let command = command.to_string();
            tokio::spawn(async move {
                relay_command(relay, sink, command).await;
            });
            return GateDecision::Relayed;
        }

        GateDecision::Native
    }
}

/// Send a chat line through the relay; echo locally on success, notice on
/// failure. Either way the native path has already been suppressed.
async fn relay_chat(relay: Arc<dyn RelaySender>, sink: Arc<dyn DisplaySink>, message: String) {
    if relay.send_message(&message).await {
        sink.show(MessageFormatter::format_echo(&message)).await;
    } else {
        sink.show(MessageFormatter::format_notice("Failed to send message!"))
            .await;
    }
}

/// Send a command through the relay, rewritten with a leading marker so the
/// server recognizes and executes it as a command.
async fn relay_command(relay: Arc<dyn RelaySender>, sink: Arc<dyn DisplaySink>, command: String) {
    let wire_form = format!("/{}", command);
    if !relay.send_message(&wire_form).await {
        sink.show(MessageFormatter::format_notice("Failed to send command!"))
            .await;
    }
}
