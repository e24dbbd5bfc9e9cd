// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with
// the AI provider and the chat moderator mocked out.
//
// Covered:
// - GET  /health
// - GET  /api/setup/status
// - GET/DELETE /api/users and /api/users/{username}
// - POST /api/debug/message and /api/debug/flag
// - GET  /api/actions and POST /api/actions/{id}/resolve
// - GET/PUT /api/settings

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use chat_sentry::ai::AiProvider;
use chat_sentry::api::{self, AppState};
use chat_sentry::moderation::ModerationService;
use chat_sentry::queue::AnalysisQueue;
use chat_sentry::store::types::{ModerationResult, SuggestedAction};
use chat_sentry::store::{ActionQueue, FalsePositiveStore, HistoryStore, SettingsStore};
use chat_sentry::twitch::ChatModerator;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chat-sentry-api-{tag}-{}.json", uuid::Uuid::new_v4()))
}

/// Always-safe provider; API tests never exercise analysis itself.
struct SafeProvider;

#[async_trait]
impl AiProvider for SafeProvider {
    async fn analyze_message(&self, _message: &str, _history: &[String]) -> ModerationResult {
        ModerationResult {
            flagged: false,
            reason: None,
            suggested_action: SuggestedAction::None,
        }
    }

    fn name(&self) -> &'static str {
        "safe"
    }
}

/// Always-succeeding moderator so approvals can go through.
struct OkModerator;

#[async_trait]
impl ChatModerator for OkModerator {
    async fn ban_user(&self, _username: &str, _reason: &str) -> Result<()> {
        Ok(())
    }

    async fn timeout_user(&self, _username: &str, _duration_secs: u64, _reason: &str) -> Result<()> {
        Ok(())
    }

    async fn unban_user(&self, _username: &str) -> Result<()> {
        Ok(())
    }
}

struct TestApp {
    router: Router,
    paths: Vec<PathBuf>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = fs::remove_file(path);
        }
    }
}

/// Build the same Router the binary uses, on throwaway store files.
fn test_app(tag: &str) -> TestApp {
    let history_path = temp_path(&format!("{tag}-hist"));
    let fp_path = temp_path(&format!("{tag}-fp"));
    let settings_path = temp_path(&format!("{tag}-settings"));

    let history = Arc::new(HistoryStore::new(&history_path));
    let false_positives = Arc::new(FalsePositiveStore::new(&fp_path));
    let settings = Arc::new(SettingsStore::new(&settings_path));
    let actions = Arc::new(ActionQueue::new());

    let queue = AnalysisQueue::new(
        Arc::clone(&history),
        Arc::clone(&actions),
        Arc::new(SafeProvider),
    );
    let moderation = Arc::new(ModerationService::new(
        Arc::clone(&actions),
        Arc::clone(&history),
        Arc::clone(&false_positives),
        Arc::clone(&settings),
        Arc::new(OkModerator),
    ));

    let router = api::create_router(AppState {
        history,
        actions,
        false_positives,
        settings,
        queue,
        moderation,
    });

    TestApp {
        router,
        paths: vec![history_path, fp_path, settings_path],
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST request")
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = test_app("health");

    let resp = app.router.clone().oneshot(get("/health")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn setup_status_reflects_settings() {
    let app = test_app("setup");

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/setup/status"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["isSetupComplete"], json!(false));
}

#[tokio::test]
async fn debug_message_makes_user_visible() {
    let app = test_app("debug-msg");

    let payload = json!({ "username": "alice", "message": "hello chat" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/debug/message", &payload))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/users/alice"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["username"], json!("alice"));
    assert_eq!(v["status"], json!("active"));
    assert_eq!(v["messages"][0]["content"], json!("hello chat"));
}

#[tokio::test]
async fn unknown_user_is_404_with_json_error() {
    let app = test_app("user-404");

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/users/nobody"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let v = read_json(resp).await;
    assert_eq!(v["error"], json!("User not found"));
}

#[tokio::test]
async fn users_list_and_clear() {
    let app = test_app("users");

    for (user, msg) in [("a", "one"), ("b", "two")] {
        let payload = json!({ "username": user, "message": msg });
        let resp = app
            .router
            .clone()
            .oneshot(post_json("/api/debug/message", &payload))
            .await
            .expect("oneshot");
        assert!(resp.status().is_success());
    }

    let resp = app.router.clone().oneshot(get("/api/users")).await.expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v.as_array().expect("array").len(), 2);

    let del = Request::builder()
        .method("DELETE")
        .uri("/api/users")
        .body(Body::empty())
        .expect("build DELETE");
    let resp = app.router.clone().oneshot(del).await.expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app.router.clone().oneshot(get("/api/users")).await.expect("oneshot");
    let v = read_json(resp).await;
    assert!(v.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn debug_flag_appears_in_pending_actions() {
    let app = test_app("flag");

    let payload = json!({ "username": "spammer", "message": "buy coins" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/debug/flag", &payload))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app.router.clone().oneshot(get("/api/actions")).await.expect("oneshot");
    let v = read_json(resp).await;
    let actions = v.as_array().expect("array");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["username"], json!("spammer"));
    assert_eq!(actions[0]["flaggedReason"], json!("Manual Debug Flag"));
    assert_eq!(actions[0]["suggestedAction"], json!("timeout"));
    assert_eq!(actions[0]["status"], json!("pending"));
}

#[tokio::test]
async fn resolving_a_flagged_action_empties_the_pending_view() {
    let app = test_app("resolve");

    let payload = json!({ "username": "spammer", "message": "buy coins" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/debug/flag", &payload))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app.router.clone().oneshot(get("/api/actions")).await.expect("oneshot");
    let v = read_json(resp).await;
    let id = v[0]["id"].as_str().expect("action id").to_string();

    let body_json = json!({ "resolution": "discarded" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json(&format!("/api/actions/{id}/resolve"), &body_json))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], json!(true));

    let resp = app.router.clone().oneshot(get("/api/actions")).await.expect("oneshot");
    let v = read_json(resp).await;
    assert!(v.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn resolving_unknown_action_is_404() {
    let app = test_app("resolve-404");

    let body_json = json!({ "resolution": "approved" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/actions/no-such-id/resolve", &body_json))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let v = read_json(resp).await;
    assert_eq!(v["error"], json!("Action not found"));
}

#[tokio::test]
async fn manual_moderation_updates_user_status() {
    let app = test_app("moderate");

    let payload = json!({ "username": "rowdy", "message": "hi" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/debug/message", &payload))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let body_json = json!({ "action": "ban" });
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/users/rowdy/moderate", &body_json))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/users/rowdy"))
        .await
        .expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["status"], json!("banned"));
}

#[tokio::test]
async fn settings_put_merges_and_get_round_trips() {
    let app = test_app("settings");

    let patch = json!({
        "aiLanguage": "German",
        "ai": { "provider": "google", "apiKey": "k" },
        "isSetupComplete": true
    });
    let req = Request::builder()
        .method("PUT")
        .uri("/api/settings")
        .header("content-type", "application/json")
        .body(Body::from(patch.to_string()))
        .expect("build PUT");
    let resp = app.router.clone().oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.router.clone().oneshot(get("/api/settings")).await.expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["aiLanguage"], json!("German"));
    assert_eq!(v["ai"]["provider"], json!("google"));
    assert_eq!(v["ai"]["apiKey"], json!("k"));
    // Untouched fields keep their defaults.
    assert_eq!(v["ai"]["model"], json!("gemma3:4b"));
    assert_eq!(v["defaultTimeoutDuration"], json!(600));

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/setup/status"))
        .await
        .expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["isSetupComplete"], json!(true));
}
