//! Error taxonomy for the request handler.
//!
//! Every variant's display string is exactly what goes on the wire in the
//! `message` field of an `ERROR` body. Unknown and expired tokens are
//! deliberately indistinguishable to the caller.

use thiserror::Error;

/// Logical failures of the three API operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Missing uuid or password")]
    MissingCredentials,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid UUID format")]
    InvalidUuid,

    #[error("Player not online")]
    PlayerOffline,

    #[error("Invalid or expired token")]
    TokenInvalid,

    #[error("Empty message")]
    EmptyMessage,

    #[error("Malformed request body")]
    MalformedRequest,

    /// Catch-all for unexpected faults; never carries internal detail.
    #[error("Internal error")]
    Internal,
}
