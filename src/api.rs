//! Thin CRUD routes over the stores plus the resolution and manual
//! moderation boundaries. All moderation decisions live in
//! [`crate::moderation`]; handlers only translate HTTP.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::moderation::{ManualAction, ModerationService, Resolution, ResolveError};
use crate::queue::AnalysisQueue;
use crate::store::types::{ActionKind, PendingAction};
use crate::store::{ActionQueue, FalsePositiveStore, HistoryStore, SettingsStore};

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryStore>,
    pub actions: Arc<ActionQueue>,
    pub false_positives: Arc<FalsePositiveStore>,
    pub settings: Arc<SettingsStore>,
    pub queue: Arc<AnalysisQueue>,
    pub moderation: Arc<ModerationService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/setup/status", get(setup_status))
        .route("/api/users", get(list_users).delete(clear_users))
        .route("/api/users/{username}", get(get_user).delete(delete_user))
        .route("/api/users/{username}/moderate", post(moderate_user))
        .route("/api/actions", get(pending_actions))
        .route("/api/actions/{id}/resolve", post(resolve_action))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/debug/message", post(debug_message))
        .route("/api/debug/flag", post(debug_flag))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn setup_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "isSetupComplete": state.settings.get().is_setup_complete }))
}

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    let mut users = state.history.get_all_users();
    // Most recently active first; users with no messages sink to the end.
    users.sort_by_key(|u| std::cmp::Reverse(u.last_activity().unwrap_or(i64::MIN)));
    Json(users)
}

async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    match state.history.get_user(&username) {
        Some(user) => Json(user).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response(),
    }
}

async fn clear_users(State(state): State<AppState>) -> impl IntoResponse {
    state.history.clear_all();
    Json(json!({ "success": true, "message": "All user data cleared" }))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    if state.history.delete_user(&username) {
        Json(json!({ "success": true, "message": format!("User {username} deleted") }))
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response()
    }
}

#[derive(Deserialize)]
struct ModerateReq {
    action: ManualAction,
}

async fn moderate_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(body): Json<ModerateReq>,
) -> impl IntoResponse {
    match state.moderation.moderate(&username, body.action).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            tracing::error!(user = %username, error = %e, "manual moderation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to execute moderation" })),
            )
                .into_response()
        }
    }
}

async fn pending_actions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.actions.get_pending())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReq {
    resolution: Resolution,
    #[serde(default)]
    ban_duration: Option<String>,
}

async fn resolve_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveReq>,
) -> impl IntoResponse {
    match state
        .moderation
        .resolve(&id, body.resolution, body.ban_duration.as_deref())
        .await
    {
        Ok(()) => {
            let message = match body.resolution {
                Resolution::Discarded => "Action discarded, learned as false positive.",
                Resolution::Approved => "Action approved and executed.",
            };
            Json(json!({ "success": true, "message": message })).into_response()
        }
        Err(ResolveError::NotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Action not found" }))).into_response()
        }
        Err(ResolveError::Execution(e)) => {
            tracing::error!(%id, error = %e, "action execution failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Failed to execute moderation" })),
            )
                .into_response()
        }
    }
}

async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.settings.get())
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct SettingsPatch {
    ai_language: Option<String>,
    default_timeout_duration: Option<u64>,
    is_setup_complete: Option<bool>,
    ai: Option<AiPatch>,
    twitch: Option<TwitchPatch>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AiPatch {
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TwitchPatch {
    username: Option<String>,
    channel: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    oauth_token: Option<String>,
}

async fn put_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    state.settings.update(|s| {
        if let Some(v) = patch.ai_language {
            s.ai_language = v;
        }
        if let Some(v) = patch.default_timeout_duration {
            s.default_timeout_duration = v;
        }
        if let Some(v) = patch.is_setup_complete {
            s.is_setup_complete = v;
        }
        if let Some(ai) = patch.ai {
            if let Some(v) = ai.provider {
                s.ai.provider = v;
            }
            if let Some(v) = ai.model {
                s.ai.model = v;
            }
            if let Some(v) = ai.api_key {
                s.ai.api_key = v;
            }
        }
        if let Some(twitch) = patch.twitch {
            if let Some(v) = twitch.username {
                s.twitch.username = v;
            }
            if let Some(v) = twitch.channel {
                s.twitch.channel = v;
            }
            if let Some(v) = twitch.client_id {
                s.twitch.client_id = v;
            }
            if let Some(v) = twitch.client_secret {
                s.twitch.client_secret = v;
            }
            if let Some(v) = twitch.oauth_token {
                s.twitch.oauth_token = v;
            }
        }
    });
    Json(json!({ "success": true, "settings": state.settings.get() }))
}

#[derive(Deserialize)]
struct DebugMessageReq {
    username: String,
    message: String,
}

/// Chat-event entry point: mirrors what the live transport does on every
/// observed message.
async fn debug_message(
    State(state): State<AppState>,
    Json(body): Json<DebugMessageReq>,
) -> impl IntoResponse {
    state.history.add_message(&body.username, &body.message);
    state.queue.add(&body.username, &body.message);
    Json(json!({ "success": true, "message": "Message simulated" }))
}

#[derive(Deserialize)]
struct DebugFlagReq {
    username: String,
    message: String,
    #[serde(default)]
    reason: Option<String>,
}

async fn debug_flag(
    State(state): State<AppState>,
    Json(body): Json<DebugFlagReq>,
) -> impl IntoResponse {
    let reason = body.reason.unwrap_or_else(|| "Manual Debug Flag".to_string());
    state.actions.add(PendingAction::new(
        &body.username,
        &body.message,
        &reason,
        ActionKind::Timeout,
    ));
    Json(json!({ "success": true, "message": "Debug action created" }))
}
