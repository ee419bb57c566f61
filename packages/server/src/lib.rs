//! Game-side relay server for Kakehashi.
//!
//! Hosts the HTTP API the client mod talks to: captcha-gated authentication,
//! bearer-token sessions, message broadcast and a bounded catch-up history.
//! The host game itself sits behind the [`game::GameAdapter`] seam.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod game;
pub mod handler;
pub mod runner;
pub mod signal;
pub mod state;

pub use config::ServerConfig;
pub use runner::run_server;
