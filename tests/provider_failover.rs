// tests/provider_failover.rs
//
// Fail-open behavior of the concrete providers: an unreachable backend, a
// backend answering garbage, and missing credentials must all collapse
// into the analysis-failed verdict instead of an error or a flag.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::post, Json, Router};
use serde_json::json;

use chat_sentry::ai::google::GoogleProvider;
use chat_sentry::ai::ollama::OllamaProvider;
use chat_sentry::ai::AiProvider;
use chat_sentry::store::types::{ModerationResult, SuggestedAction};
use chat_sentry::store::{FalsePositiveStore, SettingsStore};

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "chat-sentry-provider-{tag}-{}.json",
        uuid::Uuid::new_v4()
    ))
}

// Stores on paths that never exist: defaults only, nothing written.
fn stores(tag: &str) -> (Arc<SettingsStore>, Arc<FalsePositiveStore>) {
    (
        Arc::new(SettingsStore::new(temp_path(&format!("{tag}-settings")))),
        Arc::new(FalsePositiveStore::new(temp_path(&format!("{tag}-fp")))),
    )
}

/// Minimal stand-in for an Ollama server whose model answers prose
/// instead of the requested JSON object.
async fn spawn_babbling_ollama() -> String {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            Json(json!({ "message": { "content": "I cannot help with that." } }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

// Both ollama scenarios live in one test because OLLAMA_HOST is
// process-global.
#[tokio::test]
async fn ollama_failures_yield_the_analysis_failed_verdict() {
    let (settings, false_positives) = stores("ollama");

    // Port 9 (discard) has no listener: connection refused.
    std::env::set_var("OLLAMA_HOST", "http://127.0.0.1:9");
    let provider = OllamaProvider::new(
        "gemma3:4b".to_string(),
        Arc::clone(&settings),
        Arc::clone(&false_positives),
    );
    let verdict = provider.analyze_message("hello chat", &[]).await;
    assert_eq!(verdict, ModerationResult::analysis_failed());
    assert!(!provider.health_check().await);

    // Reachable server, unusable response body.
    let base_url = spawn_babbling_ollama().await;
    std::env::set_var("OLLAMA_HOST", &base_url);
    let provider = OllamaProvider::new(
        "gemma3:4b".to_string(),
        Arc::clone(&settings),
        Arc::clone(&false_positives),
    );
    let verdict = provider.analyze_message("hello chat", &[]).await;
    assert_eq!(verdict, ModerationResult::analysis_failed());
    assert!(!verdict.flagged, "garbage output must never flag");
    assert_eq!(verdict.suggested_action, SuggestedAction::None);

    std::env::remove_var("OLLAMA_HOST");
}

#[tokio::test]
async fn google_without_api_key_fails_open_with_config_error() {
    let (settings, false_positives) = stores("google");
    let provider = GoogleProvider::new(
        "gemma-2-27b-it".to_string(),
        String::new(),
        settings,
        false_positives,
    );

    let verdict = provider.analyze_message("hello chat", &[]).await;
    assert!(!verdict.flagged);
    assert_eq!(verdict.reason.as_deref(), Some("AI Config Error"));
    assert_eq!(verdict.suggested_action, SuggestedAction::None);
}
