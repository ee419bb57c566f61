//! Control commands for driving the relay connection.
//!
//! Everything under `/relay ...` is handled locally: connect, disconnect,
//! toggling Relay Mode, and status. Unknown subcommands fall back to help.

use std::sync::Arc;

use crate::api::{ApiClient, AuthOutcome};
use crate::display::DisplaySink;
use crate::formatter::MessageFormatter;
use crate::poller::Poller;
use crate::session::{Session, SessionPhase};

/// A parsed `/relay ...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Connect { url: String, password: String },
    Disconnect,
    Toggle,
    Status,
    Help,
}

/// Parse a control line. The caller has already established that the line
/// starts with `/relay`; anything unrecognized becomes `Help`.
pub fn parse_control(line: &str) -> ControlCommand {
    let mut parts = line.split_whitespace();
    // skip "/relay" itself
    parts.next();

    match parts.next() {
        Some("connect") => match (parts.next(), parts.next()) {
            (Some(url), Some(password)) => ControlCommand::Connect {
                url: url.to_string(),
                password: password.to_string(),
            },
            _ => ControlCommand::Help,
        },
        Some("disconnect") => ControlCommand::Disconnect,
        Some("toggle") => ControlCommand::Toggle,
        Some("status") => ControlCommand::Status,
        _ => ControlCommand::Help,
    }
}

/// Default to plain HTTP when no scheme is given and drop a trailing slash
/// so path concatenation stays predictable.
pub fn normalize_url(raw: &str) -> String {
    let mut url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Executes control commands against the session, API client and poller.
pub struct Commands {
    session: Arc<Session>,
    api: Arc<ApiClient>,
    poller: Arc<Poller>,
    sink: Arc<dyn DisplaySink>,
}

impl Commands {
    pub fn new(
        session: Arc<Session>,
        api: Arc<ApiClient>,
        poller: Arc<Poller>,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            session,
            api,
            poller,
            sink,
        }
    }

    pub async fn execute(&self, command: ControlCommand) {
        match command {
            ControlCommand::Connect { url, password } => self.connect(&url, &password).await,
            ControlCommand::Disconnect => self.disconnect().await,
            ControlCommand::Toggle => self.toggle().await,
            ControlCommand::Status => self.status().await,
            ControlCommand::Help => self.help().await,
        }
    }

    /// Authenticate against the relay server and, on success, bring the
    /// poller up. Credentials travel inside the request body, so anything
    /// short of HTTPS exposes them to the network.
    pub async fn connect(&self, url: &str, password: &str) {
        let url = normalize_url(url);

        if !url.starts_with("https://") {
            self.sink
                .show(MessageFormatter::format_warning(
                    "Connection is NOT encrypted! Your password may be visible to others.",
                ))
                .await;
        }

        self.session.set_phase(SessionPhase::Authenticating).await;
        self.session
            .set_credentials(url.clone(), password.to_string())
            .await;

        tracing::info!("Connecting to relay server: {}", url);
        let outcome = self
            .api
            .authenticate(&url, password, self.session.player_id())
            .await;
        self.apply_auth_outcome(outcome).await;
    }

    /// Resubmit a captcha answer typed by the user.
    pub async fn submit_captcha_answer(&self, answer: &str) {
        self.session.set_phase(SessionPhase::Authenticating).await;
        let outcome = self
            .api
            .submit_captcha(answer, self.session.player_id())
            .await;
        self.apply_auth_outcome(outcome).await;
    }

    async fn apply_auth_outcome(&self, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::Ok { token, player_name } => {
                if let Some(name) = player_name {
                    tracing::info!("Authenticated as {}", name);
                }
                self.session.mark_connected(token).await;
                // On a reconnect the poller may already be running; move the
                // cursor forward so stale history is not replayed.
                self.poller.reset_timestamp();
                self.poller.start().await;
                self.sink
                    .show(MessageFormatter::format_notice(
                        "Connected successfully! Relay Mode is now ON.",
                    ))
                    .await;
            }
            AuthOutcome::CaptchaRequired { challenge } => {
                self.session.set_phase(SessionPhase::CaptchaPending).await;
                let prompt = challenge
                    .unwrap_or_else(|| "Captcha required".to_string());
                self.sink.show(MessageFormatter::format_notice(&prompt)).await;
                self.sink
                    .show(MessageFormatter::format_notice(
                        "Type your answer in chat to continue.",
                    ))
                    .await;
            }
            AuthOutcome::Failed { message } => {
                self.session.mark_disconnected().await;
                self.sink
                    .show(MessageFormatter::format_notice(&format!(
                        "Authentication failed: {}",
                        message
                    )))
                    .await;
            }
        }
    }

    pub async fn disconnect(&self) {
        self.poller.stop().await;
        self.session.mark_disconnected().await;
        self.sink
            .show(MessageFormatter::format_notice("Disconnected from relay server."))
            .await;
    }

    pub async fn toggle(&self) {
        if !self.session.is_connected().await {
            self.sink
                .show(MessageFormatter::format_notice(
                    "Not connected! Use /relay connect <url> <password>",
                ))
                .await;
            return;
        }

        let enabled = !self.session.relay_enabled().await;
        self.session.set_relay_enabled(enabled).await;
        let state = if enabled { "ON" } else { "OFF" };
        self.sink
            .show(MessageFormatter::format_notice(&format!(
                "Relay Mode is now {}.",
                state
            )))
            .await;
    }

    pub async fn status(&self) {
        let phase = self.session.phase().await;
        let relay = if self.session.relay_enabled().await {
            "ON"
        } else {
            "OFF"
        };
        let url = self
            .session
            .url()
            .await
            .unwrap_or_else(|| "(none)".to_string());
        self.sink
            .show(MessageFormatter::format_notice(&format!(
                "State: {:?} | Relay Mode: {} | Server: {}",
                phase, relay, url
            )))
            .await;
    }

    pub async fn help(&self) {
        for line in [
            "Usage:",
            "  /relay connect <url> <password>",
            "  /relay disconnect",
            "  /relay toggle",
            "  /relay status",
        ] {
            self.sink.show(MessageFormatter::format_notice(line)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_with_url_and_password() {
        // テスト項目: connect が URL とパスワードに分解される
        let parsed = parse_control("/relay connect example.com:36679 secret");
        assert_eq!(
            parsed,
            ControlCommand::Connect {
                url: "example.com:36679".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_connect_without_password_falls_back_to_help() {
        // テスト項目: 引数不足の connect は Help になる
        assert_eq!(parse_control("/relay connect example.com"), ControlCommand::Help);
    }

    #[test]
    fn test_parse_known_subcommands() {
        // テスト項目: 各サブコマンドが対応する列挙子になる
        assert_eq!(parse_control("/relay disconnect"), ControlCommand::Disconnect);
        assert_eq!(parse_control("/relay toggle"), ControlCommand::Toggle);
        assert_eq!(parse_control("/relay status"), ControlCommand::Status);
    }

    #[test]
    fn test_parse_unknown_subcommand_falls_back_to_help() {
        // テスト項目: 未知のサブコマンドは Help になる
        assert_eq!(parse_control("/relay frobnicate"), ControlCommand::Help);
        assert_eq!(parse_control("/relay"), ControlCommand::Help);
    }

    #[test]
    fn test_normalize_url_prepends_scheme_and_strips_slash() {
        // テスト項目: スキーム補完と末尾スラッシュ除去
        assert_eq!(normalize_url("example.com:36679"), "http://example.com:36679");
        assert_eq!(normalize_url("http://example.com/"), "http://example.com");
        assert_eq!(
            normalize_url("https://relay.example.com"),
            "https://relay.example.com"
        );
    }
}
