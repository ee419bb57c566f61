//! End-to-end tests for the relay HTTP API.
//!
//! Each test binds the real router to an ephemeral port and drives it with
//! reqwest, exercising the same wire surface the client mod uses.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use kakehashi_server::auth::CaptchaKind;
use kakehashi_server::config::ServerConfig;
use kakehashi_server::game::InMemoryGame;
use kakehashi_server::runner::build_router;
use kakehashi_server::state::AppState;
use kakehashi_shared::time::SystemClock;

const PASSWORD: &str = "integration-secret";

struct TestApi {
    base_url: String,
    http: reqwest::Client,
    game: Arc<InMemoryGame>,
}

impl TestApi {
    /// Bind the router to an ephemeral port and return a handle to it.
    async fn start(captcha: CaptchaKind) -> Self {
        let config = ServerConfig {
            password: PASSWORD.to_string(),
            captcha,
            history_size: 100,
            token_expiry_seconds: 3600,
        };
        let game = Arc::new(InMemoryGame::new());
        let state = Arc::new(AppState::new(config, game.clone(), Arc::new(SystemClock)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        let app = build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            http: reqwest::Client::new(),
            game,
        }
    }

    async fn online_player(&self, name: &str) -> Uuid {
        let player = Uuid::new_v4();
        self.game.add_player(player, name).await;
        player
    }

    async fn auth(&self, uuid: &Uuid, captcha_response: Option<&str>) -> Value {
        let mut body = json!({ "uuid": uuid.to_string(), "password": PASSWORD });
        if let Some(answer) = captcha_response {
            body["captcha_response"] = json!(answer);
        }
        self.http
            .post(format!("{}/api/auth", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Authenticate and return the issued token (no-captcha servers only).
    async fn token_for(&self, uuid: &Uuid) -> String {
        let body = self.auth(uuid, None).await;
        assert_eq!(body["status"], "OK");
        body["token"].as_str().unwrap().to_string()
    }

    async fn send(&self, token: &str, message: &str) -> Value {
        self.http
            .post(format!("{}/api/send", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "message": message }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn fetch(&self, token: &str, since: i64) -> Value {
        self.http
            .get(format!("{}/api/fetch?since={}", self.base_url, since))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

fn solve_captcha(challenge: &str) -> String {
    let inner = challenge
        .strip_prefix("What is ")
        .and_then(|s| s.strip_suffix('?'))
        .expect("challenge should follow the arithmetic format");
    let sum: i32 = inner.split(" + ").map(|n| n.parse::<i32>().unwrap()).sum();
    sum.to_string()
}

#[tokio::test]
async fn test_health_endpoint_reports_ok() {
    let api = TestApi::start(CaptchaKind::None).await;

    let body: Value = api
        .http
        .get(format!("{}/api/health", api.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "OK");
    assert_eq!(body["server"], "kakehashi-server");
}

#[tokio::test]
async fn test_auth_then_fetch_end_to_end() {
    let api = TestApi::start(CaptchaKind::None).await;
    let player = api.online_player("alice").await;

    // 正しい認証情報で 16 文字のトークンが返る
    let auth_body = api.auth(&player, None).await;
    assert_eq!(auth_body["status"], "OK");
    let token = auth_body["token"].as_str().unwrap();
    assert_eq!(token.len(), 16);
    assert_eq!(auth_body["player_name"], "alice");

    // Authorization ヘッダ無しの fetch は HTTP 401 + ERROR ボディ
    let response = api
        .http
        .get(format!("{}/api/fetch?since=0", api.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ERROR");

    // Bearer トークン付きなら OK と空のメッセージ一覧が返る
    let body = api.fetch(token, 0).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn test_wrong_method_returns_405_with_error_body() {
    let api = TestApi::start(CaptchaKind::None).await;

    let response = api
        .http
        .get(format!("{}/api/auth", api.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ERROR");
}

#[tokio::test]
async fn test_send_is_visible_to_other_client_via_fetch() {
    let api = TestApi::start(CaptchaKind::None).await;
    let alice = api.online_player("alice").await;
    let bob = api.online_player("bob").await;

    let alice_token = api.token_for(&alice).await;
    let bob_token = api.token_for(&bob).await;

    let send_body = api.send(&alice_token, "hello from alice").await;
    assert_eq!(send_body["status"], "OK");

    let fetch_body = api.fetch(&bob_token, 0).await;
    assert_eq!(fetch_body["status"], "OK");
    let messages = fetch_body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sender"], "alice");
    assert_eq!(messages[0]["message"], "hello from alice");
    assert!(messages[0]["timestamp"].as_i64().unwrap() > 0);

    // 在席中の認証済みプレイヤー二人に配送されている
    let deliveries = api.game.deliveries().await;
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|(_, line)| line == "[DC] alice: hello from alice"));
}

#[tokio::test]
async fn test_send_truncates_oversized_message_over_the_wire() {
    let api = TestApi::start(CaptchaKind::None).await;
    let alice = api.online_player("alice").await;
    let token = api.token_for(&alice).await;

    let send_body = api.send(&token, &"y".repeat(400)).await;
    assert_eq!(send_body["status"], "OK");

    let fetch_body = api.fetch(&token, 0).await;
    let messages = fetch_body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["message"].as_str().unwrap().len(), 256);
}

#[tokio::test]
async fn test_captcha_handshake_over_the_wire() {
    let api = TestApi::start(CaptchaKind::SimpleMath).await;
    let player = api.online_player("alice").await;

    // 初回認証はチャレンジ付きの CAPTCHA_REQUIRED
    let first = api.auth(&player, None).await;
    assert_eq!(first["status"], "CAPTCHA_REQUIRED");
    let challenge = first["captcha_image"].as_str().unwrap().to_string();

    // 正答を添えた再認証でトークンが発行される
    let answer = solve_captcha(&challenge);
    let second = api.auth(&player, Some(&answer)).await;
    assert_eq!(second["status"], "OK");
    assert_eq!(second["token"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_auth_rejections_are_http_200_with_error_body() {
    let api = TestApi::start(CaptchaKind::None).await;
    let offline = Uuid::new_v4();

    let response = api
        .http
        .post(format!("{}/api/auth", api.base_url))
        .json(&json!({ "uuid": offline.to_string(), "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["message"], "Player not online");
}
