//! Standalone relay server binary.
//!
//! Hosts the Kakehashi HTTP API with an in-memory game roster. Players are
//! registered up front via `--player`; a real deployment replaces the
//! roster with an adapter into the host game.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakehashi-server -- --password s3cret --player alice
//! cargo run --bin kakehashi-server -- --captcha simple-math --player 7c9e6679-7425-40de-963d-196b42f1a3a5:alice
//! ```

use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;

use kakehashi_server::auth::CaptchaKind;
use kakehashi_server::config::ServerConfig;
use kakehashi_server::game::InMemoryGame;
use kakehashi_server::run_server;
use kakehashi_server::state::AppState;
use kakehashi_shared::logger::setup_logger;
use kakehashi_shared::time::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "kakehashi-server")]
#[command(about = "HTTP chat relay server with token sessions and captcha-gated login", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "36679")]
    port: u16,

    /// Shared secret clients must present when authenticating
    #[arg(long, default_value = kakehashi_server::config::DEFAULT_PASSWORD)]
    password: String,

    /// Captcha provider: none, simple-math, external
    #[arg(long, default_value = "none")]
    captcha: CaptchaKind,

    /// Capacity of the message history buffer
    #[arg(long, default_value = "100")]
    history_size: usize,

    /// Token lifetime in seconds (0 disables expiry)
    #[arg(long, default_value = "3600")]
    token_expiry: i64,

    /// Player to seed the roster with, either "name" or "uuid:name".
    /// May be repeated.
    #[arg(long = "player")]
    players: Vec<String>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let config = ServerConfig {
        password: args.password,
        captcha: args.captcha,
        history_size: args.history_size,
        token_expiry_seconds: args.token_expiry,
    };

    let game = Arc::new(InMemoryGame::new());
    for spec in &args.players {
        let (player_id, name) = match spec.split_once(':') {
            Some((uuid_str, name)) => match Uuid::parse_str(uuid_str) {
                Ok(uuid) => (uuid, name.to_string()),
                Err(e) => {
                    tracing::error!("Invalid player uuid '{}': {}", uuid_str, e);
                    std::process::exit(1);
                }
            },
            None => (Uuid::new_v4(), spec.clone()),
        };
        game.add_player(player_id, name.clone()).await;
        tracing::info!("Player {} registered with uuid {}", name, player_id);
    }

    let state = Arc::new(AppState::new(config, game, Arc::new(SystemClock)));

    if let Err(e) = run_server(args.host, args.port, state).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
