//! Shared data model for the stores and the moderation pipeline.
//!
//! Everything here is persisted and/or served over the HTTP API, so wire
//! names are camelCase and enum variants are the lowercase tokens the UI
//! and the AI response contract use.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall-clock timestamp in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A single observed chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub username: String,
    pub content: String,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(username: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            content: content.to_string(),
            timestamp: now_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    TimedOut,
    Banned,
}

/// Per-user record owned by the history store.
/// Invariant: `messages.len() <= MESSAGE_CAP`, most-recent-last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUser {
    pub username: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: UserStatus,
}

impl ChatUser {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            messages: Vec::new(),
            notes: None,
            status: UserStatus::Active,
        }
    }

    /// Timestamp of the most recent message, if any. Used for recency sort.
    pub fn last_activity(&self) -> Option<i64> {
        self.messages.last().map(|m| m.timestamp)
    }
}

/// Action the AI suggests for a flagged message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    #[default]
    None,
    Timeout,
    Ban,
}

/// Verdict returned by an AI provider. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub flagged: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub suggested_action: SuggestedAction,
}

impl ModerationResult {
    /// Fail-open sentinel: a broken AI backend must never escalate to a
    /// moderation action, and must never block the pipeline.
    pub fn analysis_failed() -> Self {
        Self {
            flagged: false,
            reason: Some("Analysis Failed".to_string()),
            suggested_action: SuggestedAction::None,
        }
    }
}

/// Concrete action a human can approve. `none` is not representable here:
/// unflagged verdicts never reach the action queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Timeout,
    Ban,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Approved,
    Discarded,
}

/// A queued, human-reviewable moderation decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: String,
    pub username: String,
    /// May contain several batched messages joined by the queue separator.
    pub message_content: String,
    pub flagged_reason: String,
    pub suggested_action: ActionKind,
    pub timestamp: i64,
    pub status: ActionStatus,
}

impl PendingAction {
    pub fn new(username: &str, content: &str, reason: &str, kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            message_content: content.to_string(),
            flagged_reason: reason.to_string(),
            suggested_action: kind,
            timestamp: now_ms(),
            status: ActionStatus::Pending,
        }
    }
}
