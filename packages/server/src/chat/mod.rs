//! Message history and broadcast formatting.

pub mod history;

pub use history::{ChatHistory, StoredMessage};
