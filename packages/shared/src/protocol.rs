//! Wire protocol types for the Kakehashi HTTP API.
//!
//! All endpoints speak JSON. Logical failures travel in the body with
//! `status = ERROR` over HTTP 200; only missing authorization (401) and
//! wrong HTTP methods (405) are reported through the status code.

use serde::{Deserialize, Serialize};

/// Maximum length of a relayed chat message in characters.
/// Longer messages are truncated by the server, never rejected.
pub const MAX_MESSAGE_LEN: usize = 256;

/// Logical outcome carried in every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "CAPTCHA_REQUIRED")]
    CaptchaRequired,
    #[serde(rename = "ERROR")]
    Error,
}

/// Request body for `POST /api/auth`.
///
/// Fields are optional so that a missing field is reported as a protocol
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub uuid: Option<String>,
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_response: Option<String>,
}

/// Response body for `POST /api/auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request body for `POST /api/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub message: Option<String>,
}

/// Response body for `POST /api/send` and for error replies on any route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
        }
    }
}

/// A single relayed chat message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub sender: String,
    pub message: String,
    pub timestamp: i64,
}

/// Response body for `GET /api/fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<MessageDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: Status,
    pub server: String,
    pub version: String,
}
