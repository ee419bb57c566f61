//! Request handlers for the relay API.
//!
//! All logical failures are HTTP 200 with an `ERROR` (or `CAPTCHA_REQUIRED`)
//! body; only a missing bearer token (401) and a wrong HTTP method (405) are
//! reported through the status code. Unexpected faults are caught and
//! collapsed to a generic `Internal error` body with no detail attached.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use kakehashi_shared::protocol::{
    AuthRequest, AuthResponse, FetchResponse, HealthResponse, MAX_MESSAGE_LEN, MessageDto,
    SendRequest, Status, StatusResponse,
};

use crate::chat::StoredMessage;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /api/fetch`.
///
/// `since` is kept as a string so an unparsable value degrades to the
/// default instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub since: Option<String>,
}

pub async fn auth_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Json<AuthResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected malformed auth body: {}", rejection);
            return Json(auth_error(ApiError::MalformedRequest));
        }
    };

    match guarded("auth", process_auth(state, request)).await {
        Ok(response) => Json(response),
        Err(error) => Json(auth_error(error)),
    }
}

pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized();
    };
    let token = token.to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected malformed send body: {}", rejection);
            return Json(StatusResponse::error(
                ApiError::MalformedRequest.to_string(),
            ))
            .into_response();
        }
    };

    let body = match guarded("send", process_send(state, token, request)).await {
        Ok(response) => response,
        Err(error) => StatusResponse::error(error.to_string()),
    };
    Json(body).into_response()
}

pub async fn fetch_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<FetchQuery>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized();
    };
    let token = token.to_string();

    let since = query
        .since
        .as_deref()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0);

    let body = match guarded("fetch", process_fetch(state, token, since)).await {
        Ok(response) => response,
        Err(error) => FetchResponse {
            status: Status::Error,
            messages: None,
            message: Some(error.to_string()),
        },
    };
    Json(body).into_response()
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: Status::Ok,
        server: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for requests hitting a known route with the wrong HTTP method.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(StatusResponse::error("Method not allowed")),
    )
        .into_response()
}

/// Authenticate a player: password, presence, captcha gate, token issuance.
///
/// Every call re-validates the password, including captcha resubmissions;
/// there is no separate resume path.
async fn process_auth(
    state: Arc<AppState>,
    request: AuthRequest,
) -> Result<AuthResponse, ApiError> {
    let (uuid_str, password) = match (request.uuid, request.password) {
        (Some(uuid), Some(password)) => (uuid, password),
        _ => return Err(ApiError::MissingCredentials),
    };

    if state.config.password != password {
        tracing::debug!("Auth failed for {}: invalid password", uuid_str);
        return Err(ApiError::InvalidPassword);
    }

    let player_id = Uuid::parse_str(&uuid_str).map_err(|_| ApiError::InvalidUuid)?;

    let Some(player_name) = state.game.player_name(player_id).await else {
        return Err(ApiError::PlayerOffline);
    };

    if state.captcha.required() {
        match request.captcha_response {
            None => return Ok(captcha_required(&state, player_id).await),
            Some(answer) => {
                // Validation consumes the pending challenge; a mismatch
                // hands out a fresh one rather than retrying the old.
                if !state.captcha.validate(player_id, &answer).await {
                    return Ok(captcha_required(&state, player_id).await);
                }
            }
        }
    }

    let token = state.tokens.issue(player_id).await;
    tracing::info!("Player {} ({}) authenticated via relay", player_name, player_id);

    Ok(AuthResponse {
        status: Status::Ok,
        token: Some(token),
        player_name: Some(player_name),
        captcha_image: None,
        message: None,
    })
}

async fn captcha_required(state: &AppState, player_id: Uuid) -> AuthResponse {
    AuthResponse {
        status: Status::CaptchaRequired,
        token: None,
        player_name: None,
        captcha_image: state.captcha.challenge(player_id).await,
        message: None,
    }
}

/// Relay an inbound message: resolve the sender, sanitize, then either
/// dispatch a command natively or broadcast a chat line.
async fn process_send(
    state: Arc<AppState>,
    token: String,
    request: SendRequest,
) -> Result<StatusResponse, ApiError> {
    let player_id = state
        .tokens
        .resolve(&token)
        .await
        .ok_or(ApiError::TokenInvalid)?;

    let Some(sender_name) = state.game.player_name(player_id).await else {
        // The player left the game after authenticating; drop the session.
        state.tokens.revoke_for_player(player_id).await;
        return Err(ApiError::PlayerOffline);
    };

    let message = request.message.as_deref().map(str::trim).unwrap_or("");
    if message.is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    // Never reject for length, only truncate.
    let message: String = message.chars().take(MAX_MESSAGE_LEN).collect();

    tracing::debug!("Message from {}: {}", sender_name, message);

    if let Some(command) = message.strip_prefix('/') {
        state
            .game
            .dispatch_command(player_id, command.to_string())
            .await;
    } else {
        let stored = state.history.append(player_id, &sender_name, message).await;
        broadcast(&state, &stored).await;
    }

    Ok(StatusResponse::ok())
}

/// Fan a stored message out to every authenticated, currently present
/// player. The broadcast set is recomputed on every call; a player leaving
/// mid-call may or may not receive the line.
async fn broadcast(state: &AppState, message: &StoredMessage) {
    let line = format_broadcast_line(&message.sender_name, &message.text);

    for player_id in state.tokens.authenticated_players().await {
        if state.game.player_name(player_id).await.is_some() {
            state.game.deliver_chat(player_id, line.clone()).await;
        }
    }

    tracing::info!("[relay] {}: {}", message.sender_name, message.text);
}

async fn process_fetch(
    state: Arc<AppState>,
    token: String,
    since: i64,
) -> Result<FetchResponse, ApiError> {
    state
        .tokens
        .resolve(&token)
        .await
        .ok_or(ApiError::TokenInvalid)?;

    let messages = state
        .history
        .since(since)
        .await
        .into_iter()
        .map(|m| MessageDto {
            sender: m.sender_name,
            message: m.text,
            timestamp: m.timestamp,
        })
        .collect();

    Ok(FetchResponse {
        status: Status::Ok,
        messages: Some(messages),
        message: None,
    })
}

fn format_broadcast_line(sender_name: &str, text: &str) -> String {
    format!("[DC] {}: {}", sender_name, text)
}

fn auth_error(error: ApiError) -> AuthResponse {
    AuthResponse {
        status: Status::Error,
        token: None,
        player_name: None,
        captcha_image: None,
        message: Some(error.to_string()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(StatusResponse::error("Missing or invalid authorization")),
    )
        .into_response()
}

/// Run an operation on its own task so a panic inside it surfaces as a
/// generic internal error instead of tearing down the connection.
async fn guarded<T, F>(operation: &'static str, fut: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(fault) => {
            tracing::error!("{} handler fault: {}", operation, fault);
            Err(ApiError::Internal)
        }
    }
}
