//! Interactive relay client binary.
//!
//! Reads chat lines and slash commands from the terminal. `/relay ...`
//! commands drive the connection; everything else is routed by the gate,
//! going through the relay once connected and staying local otherwise.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakehashi-client
//! cargo run --bin kakehashi-client -- --url 127.0.0.1:36679 --password s3cret
//! ```

use clap::Parser;
use uuid::Uuid;

use kakehashi_client::run_client;
use kakehashi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kakehashi-client")]
#[command(about = "Interactive client for the Kakehashi chat relay", long_about = None)]
struct Args {
    /// Player uuid to authenticate as (random when omitted)
    #[arg(long)]
    uuid: Option<Uuid>,

    /// Relay server URL to connect to on startup (requires --password)
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Password for the startup connection
    #[arg(short = 'p', long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let player_id = args.uuid.unwrap_or_else(Uuid::new_v4);

    if let Err(e) = run_client(player_id, args.url, args.password).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
