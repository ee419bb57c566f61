//! Error types for the relay client.

use thiserror::Error;

/// Client-specific errors.
///
/// Network and protocol failures never surface here; the API layer
/// collapses them into typed outcomes. These are the faults of the client
/// process itself.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Terminal input could not be initialized or read
    #[error("Terminal input error: {0}")]
    Input(String),
}
