/// Integration tests for the REST API.
/// Spins up a real server on a free port and exercises every endpoint,
/// including the auth, validation, and vendor-rate-limit error paths.
use async_trait::async_trait;
use makond::config::ServiceConfig;
use makond::mentor::{ChatMessage, CompletionService, MentorError};
use makond::storage::Storage;
use makond::{rest, AppContext};
use serde_json::{json, Value};
use std::sync::Arc;

/// Canned completion vendor: a fixed reply, or a rate-limit signal.
struct StubMentor {
    reply: Result<String, ()>,
}

#[async_trait]
impl CompletionService for StubMentor {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, MentorError> {
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(MentorError::RateLimited("juda band".to_string())),
        }
    }
}

/// Start a server on a random port and return its base URL.
async fn start_test_server(
    mentor: Arc<dyn CompletionService>,
) -> (String, Arc<AppContext>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(ServiceConfig::new(
        None,
        Some(dir.path().to_path_buf()),
        Some("warn".to_string()),
        None,
        false,
    ));
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        mentor,
        started_at: std::time::Instant::now(),
    });

    let router = rest::build_router(ctx.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (format!("http://{addr}"), ctx, dir)
}

fn ok_mentor() -> Arc<dyn CompletionService> {
    Arc::new(StubMentor {
        reply: Ok("Salom! Keling, boshlaymiz.".to_string()),
    })
}

/// Provision a user with a wallet balance and return (user_id, bearer token).
async fn seed_user(ctx: &AppContext, balance: i64) -> (String, String) {
    let user = ctx.storage.create_user(balance).await.unwrap();
    let token = ctx.storage.issue_token(&user.id).await.unwrap();
    (user.id, token)
}

#[tokio::test]
async fn health_needs_no_auth() {
    let (base, _ctx, _dir) = start_test_server(ok_mentor()).await;

    let body: Value = reqwest::get(format!("{base}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_or_unknown_token_is_401() {
    let (base, _ctx, _dir) = start_test_server(ok_mentor()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/progress/save"))
        .json(&json!({ "course_id": "rust-101", "lesson_id": "ownership" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{base}/api/v1/shop/buy"))
        .bearer_auth("not-a-real-token")
        .json(&json!({ "item_id": "streak_freeze", "price": 10000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn save_rejects_missing_ids() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/progress/save"))
        .bearer_auth(&token)
        .json(&json!({ "course_id": "rust-101" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing course_id or lesson_id");
}

#[tokio::test]
async fn save_then_list_roundtrip() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/progress/save"))
        .bearer_auth(&token)
        .json(&json!({
            "course_id": "rust-101",
            "lesson_id": "ownership",
            "progress_seconds": 240,
            "completed": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user_id"], user_id.as_str());
    assert_eq!(body["data"]["progress_seconds"], 240);
    assert_eq!(body["data"]["completed"], true);

    let body: Value = client
        .get(format!("{base}/api/v1/progress?course_id=rust-101"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["lesson_id"], "ownership");
}

#[tokio::test]
async fn rewards_summary_reflects_activity() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    // Zero-values before any activity.
    let body: Value = client
        .get(format!("{base}/api/v1/rewards"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["current_streak"], 0);
    assert_eq!(body["total_xp"], 0);
    assert_eq!(body["league"], "bronze");

    client
        .post(format!("{base}/api/v1/progress/save"))
        .bearer_auth(&token)
        .json(&json!({
            "course_id": "rust-101",
            "lesson_id": "ownership",
            "completed": true,
        }))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{base}/api/v1/rewards"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["current_streak"], 1);
    assert_eq!(body["longest_streak"], 1);
    assert_eq!(body["total_xp"], 20);
}

#[tokio::test]
async fn shop_buy_happy_path_and_wallet_read() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 50_000).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/shop/buy"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": "streak_freeze", "price": 10000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["newBalance"], 40_000);

    let body: Value = client
        .get(format!("{base}/api/v1/wallet"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["balance"], 40_000);
}

#[tokio::test]
async fn shop_buy_error_taxonomy() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 5_000).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/shop/buy"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": "golden_badge", "price": 10000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "UnknownItem");

    let resp = client
        .post(format!("{base}/api/v1/shop/buy"))
        .bearer_auth(&token)
        .json(&json!({ "item_id": "streak_freeze", "price": 10000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "InsufficientFunds");

    // A failed purchase leaves the balance as it was.
    let body: Value = client
        .get(format!("{base}/api/v1/wallet"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["balance"], 5_000);
}

#[tokio::test]
async fn mentor_chat_proxies_the_vendor_reply() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/mentor/chat"))
        .bearer_auth(&token)
        .json(&json!({ "messages": [{ "role": "user", "content": "Salom" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "Salom! Keling, boshlaymiz.");
}

#[tokio::test]
async fn mentor_chat_requires_messages() {
    let (base, ctx, _dir) = start_test_server(ok_mentor()).await;
    let (_user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/mentor/chat"))
        .bearer_auth(&token)
        .json(&json!({ "messages": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn mentor_chat_surfaces_vendor_rate_limit_as_429() {
    let rate_limited: Arc<dyn CompletionService> = Arc::new(StubMentor { reply: Err(()) });
    let (base, ctx, _dir) = start_test_server(rate_limited).await;
    let (_user_id, token) = seed_user(&ctx, 0).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/mentor/chat"))
        .bearer_auth(&token)
        .json(&json!({ "messages": [{ "role": "user", "content": "Salom" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["details"], "juda band");
}
