//! Interactive client loop.
//!
//! Reads lines with rustyline on a blocking thread and feeds them into the
//! async loop over a channel. Each line is classified once: a pending
//! captcha answer, a `/relay` control command, another slash command, or a
//! plain chat line. Whatever the gate hands back as `Native` goes to the
//! native chat path.

use std::sync::Arc;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use uuid::Uuid;

use kakehashi_shared::time::SystemClock;

use crate::api::ApiClient;
use crate::commands::{Commands, parse_control};
use crate::display::{DisplaySink, StdoutSink};
use crate::error::ClientError;
use crate::gate::{ChatGate, GateDecision, RELAY_COMMAND};
use crate::poller::Poller;
use crate::session::{Session, SessionPhase};

/// The chat path that exists without the relay. The CLI has no game behind
/// it, so its native path just prints locally.
pub trait NativeChat: Send + Sync {
    fn chat(&self, message: &str);
    fn command(&self, command: &str);
}

struct ConsoleNative;

impl NativeChat for ConsoleNative {
    fn chat(&self, message: &str) {
        println!("(local) {}", message);
    }

    fn command(&self, command: &str) {
        println!("(local command) /{}", command);
    }
}

/// Run the interactive client until stdin closes.
///
/// # Arguments
/// * `player_id` - identity presented to the relay server
/// * `url` / `password` - when both are given, connect before reading input
pub async fn run_client(
    player_id: Uuid,
    url: Option<String>,
    password: Option<String>,
) -> Result<(), ClientError> {
    let session = Arc::new(Session::new(player_id));
    let sink: Arc<dyn DisplaySink> = Arc::new(StdoutSink);
    let api = Arc::new(ApiClient::new(session.clone()));
    let poller = Arc::new(Poller::new(
        api.clone(),
        sink.clone(),
        session.clone(),
        Arc::new(SystemClock),
    ));
    let commands = Commands::new(session.clone(), api.clone(), poller.clone(), sink.clone());
    let gate = ChatGate::new(session.clone(), api, sink);
    let native = ConsoleNative;

    tracing::info!("Client started as {}", player_id);
    println!("Type /relay connect <url> <password> to join. Ctrl+C to exit.");

    if let (Some(url), Some(password)) = (url, password) {
        commands.connect(&url, &password).await;
    }

    let mut input_rx = spawn_readline_thread()?;

    while let Some(line) = input_rx.recv().await {
        if session.phase().await == SessionPhase::CaptchaPending && !line.starts_with('/') {
            commands.submit_captcha_answer(&line).await;
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if command.starts_with(RELAY_COMMAND) {
                commands.execute(parse_control(&line)).await;
            } else if gate.handle_command(command).await == GateDecision::Native {
                native.command(command);
            }
            continue;
        }

        if gate.handle_chat(&line).await == GateDecision::Native {
            native.chat(&line);
        }
    }

    poller.stop().await;
    tracing::info!("Client exiting");
    Ok(())
}

/// Spawn a blocking thread for rustyline (synchronous readline). The thread
/// ends when stdin closes or the channel receiver is dropped.
fn spawn_readline_thread() -> Result<mpsc::UnboundedReceiver<String>, ClientError> {
    let mut rl = DefaultEditor::new().map_err(|e| ClientError::Input(e.to_string()))?;
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        loop {
            match rl.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    Ok(input_rx)
}
