//! Display sinks: where relayed messages and local notices end up.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Destination for user-visible lines.
///
/// In the CLI binary this is the terminal; embedders (and the tests) can
/// route lines anywhere else.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    async fn show(&self, line: String);
}

/// Prints lines to stdout.
pub struct StdoutSink;

#[async_trait]
impl DisplaySink for StdoutSink {
    async fn show(&self, line: String) {
        println!("{}", line);
    }
}

/// Forwards lines into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DisplaySink for ChannelSink {
    async fn show(&self, line: String) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.tx.send(line);
    }
}
