//! HTTP client for the relay API.
//!
//! Every operation reduces its transport outcome to a typed result; nothing
//! here returns `Err` to the caller. Timeouts, connection failures and
//! malformed responses all collapse into `Failed` / `false` / `ok = false`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use kakehashi_shared::protocol::{
    AuthRequest, AuthResponse, FetchResponse, MessageDto, SendRequest, Status, StatusResponse,
};

use crate::poller::MessageFetcher;
use crate::session::Session;

/// Fixed per-call timeout; exceeding it counts as any other transport failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of an authentication attempt.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Ok {
        token: String,
        player_name: Option<String>,
    },
    CaptchaRequired {
        challenge: Option<String>,
    },
    Failed {
        message: String,
    },
}

/// Outcome of a fetch. `ok = false` means the poll failed; callers cannot
/// distinguish "no new messages" from failure except via this flag.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub ok: bool,
    pub messages: Vec<MessageDto>,
}

impl FetchOutcome {
    pub fn failed() -> Self {
        Self {
            ok: false,
            messages: Vec::new(),
        }
    }
}

/// HTTP client for the four relay operations.
pub struct ApiClient {
    http: reqwest::Client,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(session: Arc<Session>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { http, session }
    }

    /// Authenticate against the relay server.
    pub async fn authenticate(&self, url: &str, password: &str, player_id: Uuid) -> AuthOutcome {
        let body = AuthRequest {
            uuid: Some(player_id.to_string()),
            password: Some(password.to_string()),
            captcha_response: None,
        };
        self.post_auth(url, body).await
    }

    /// Resubmit the captcha answer through the same auth endpoint, using
    /// the credentials stored in the session.
    pub async fn submit_captcha(&self, answer: &str, player_id: Uuid) -> AuthOutcome {
        let (Some(url), Some(password)) =
            (self.session.url().await, self.session.password().await)
        else {
            return AuthOutcome::Failed {
                message: "No stored credentials".to_string(),
            };
        };

        let body = AuthRequest {
            uuid: Some(player_id.to_string()),
            password: Some(password),
            captcha_response: Some(answer.to_string()),
        };
        self.post_auth(&url, body).await
    }

    async fn post_auth(&self, url: &str, body: AuthRequest) -> AuthOutcome {
        let result = self
            .http
            .post(format!("{}/api/auth", url))
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Authentication request failed: {}", e);
                return AuthOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        match response.json::<AuthResponse>().await {
            Ok(auth) => match auth.status {
                Status::Ok => match auth.token {
                    Some(token) => AuthOutcome::Ok {
                        token,
                        player_name: auth.player_name,
                    },
                    None => AuthOutcome::Failed {
                        message: "Server returned OK without a token".to_string(),
                    },
                },
                Status::CaptchaRequired => AuthOutcome::CaptchaRequired {
                    challenge: auth.captcha_image,
                },
                Status::Error => AuthOutcome::Failed {
                    message: auth
                        .message
                        .unwrap_or_else(|| "Unknown error".to_string()),
                },
            },
            Err(e) => {
                tracing::error!("Malformed auth response: {}", e);
                AuthOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Send a message through the relay. Returns `true` only on a confirmed
    /// `OK`; no retry, no queueing.
    pub async fn send_message(&self, message: &str) -> bool {
        let (Some(url), Some(token)) = (self.session.url().await, self.session.token().await)
        else {
            return false;
        };

        let body = SendRequest {
            message: Some(message.to_string()),
        };

        let result = self
            .http
            .post(format!("{}/api/send", url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to send message: {}", e);
                return false;
            }
        };

        match response.json::<StatusResponse>().await {
            Ok(status) => status.status == Status::Ok,
            Err(e) => {
                tracing::error!("Malformed send response: {}", e);
                false
            }
        }
    }

    /// Fetch messages newer than `since`.
    pub async fn fetch_messages(&self, since: i64) -> FetchOutcome {
        let (Some(url), Some(token)) = (self.session.url().await, self.session.token().await)
        else {
            return FetchOutcome::failed();
        };

        let mut request_url = format!("{}/api/fetch", url);
        if since > 0 {
            request_url.push_str(&format!("?since={}", since));
        }

        let result = self
            .http
            .get(request_url)
            .bearer_auth(token)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to fetch messages: {}", e);
                return FetchOutcome::failed();
            }
        };

        match response.json::<FetchResponse>().await {
            Ok(fetch) => FetchOutcome {
                ok: true,
                messages: fetch.messages.unwrap_or_default(),
            },
            Err(e) => {
                tracing::error!("Malformed fetch response: {}", e);
                FetchOutcome::failed()
            }
        }
    }
}

#[async_trait]
impl MessageFetcher for ApiClient {
    async fn fetch_messages(&self, since: i64) -> FetchOutcome {
        ApiClient::fetch_messages(self, since).await
    }
}
