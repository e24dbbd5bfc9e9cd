//! Chat Sentry — Binary Entrypoint
//! Wires the stores, the analysis queue, and the Axum HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_sentry::ai::selector::ProviderSelector;
use chat_sentry::api::{self, AppState};
use chat_sentry::moderation::ModerationService;
use chat_sentry::queue::AnalysisQueue;
use chat_sentry::store::{ActionQueue, FalsePositiveStore, HistoryStore, SettingsStore};
use chat_sentry::twitch::HelixClient;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_sentry=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn data_dir() -> PathBuf {
    std::env::var("CHAT_SENTRY_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let history = Arc::new(HistoryStore::new(dir.join("users.json")));
    let false_positives = Arc::new(FalsePositiveStore::new(dir.join("false_positives.json")));
    let settings = Arc::new(SettingsStore::new(dir.join("settings.json")));
    let actions = Arc::new(ActionQueue::new());

    let selector = Arc::new(ProviderSelector::new(
        Arc::clone(&settings),
        Arc::clone(&false_positives),
    ));
    let queue = AnalysisQueue::new(Arc::clone(&history), Arc::clone(&actions), selector);
    let scheduler = queue.spawn();

    let helix = Arc::new(HelixClient::new(Arc::clone(&settings)));
    let moderation = Arc::new(ModerationService::new(
        Arc::clone(&actions),
        Arc::clone(&history),
        Arc::clone(&false_positives),
        Arc::clone(&settings),
        helix,
    ));

    let state = AppState {
        history,
        actions,
        false_positives,
        settings,
        queue,
        moderation,
    };
    let router = api::create_router(state).merge(chat_sentry::metrics::install());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "chat-sentry listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    // Store writes are synchronous, so nothing is lost by aborting the
    // scheduler here; an in-flight AI call is not worth waiting for.
    scheduler.abort();
    Ok(())
}
