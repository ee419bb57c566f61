//! Formatting of chat lines and notices shown to the user.

use kakehashi_shared::time::millis_to_clock;

/// Formats relayed messages and local notices for the display sink.
pub struct MessageFormatter;

impl MessageFormatter {
    /// A message received through the relay.
    pub fn format_incoming(sender: &str, message: &str, timestamp: i64) -> String {
        format!("[{}] [DC] {}: {}", millis_to_clock(timestamp), sender, message)
    }

    /// Local echo of a message this client sent successfully.
    pub fn format_echo(message: &str) -> String {
        format!("[You] {}", message)
    }

    /// A local-only notice, never sent anywhere.
    pub fn format_notice(message: &str) -> String {
        format!("[Kakehashi] {}", message)
    }

    /// A local-only warning (e.g., unencrypted connection).
    pub fn format_warning(message: &str) -> String {
        format!("⚠ [Kakehashi] {}", message)
    }
}
