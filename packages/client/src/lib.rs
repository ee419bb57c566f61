//! Player-side relay client for Kakehashi.
//!
//! Talks to the relay server over its HTTP API: a captcha-aware
//! authentication flow, a fire-and-forget send path, and a background
//! poller that keeps a timestamp cursor over the server's message history.
//! The [`gate::ChatGate`] decides per outgoing line whether it travels
//! through the relay or falls through to the native chat path.

pub mod api;
pub mod commands;
pub mod display;
pub mod error;
pub mod formatter;
pub mod gate;
pub mod poller;
pub mod runner;
pub mod session;

pub use error::ClientError;
pub use runner::run_client;
