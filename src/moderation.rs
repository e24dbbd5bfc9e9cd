//! Resolution boundary: turns human decisions on queued actions into
//! executor calls and store updates.
//!
//! Local state (action status, user status) advances only after the remote
//! moderation call confirms success; a rejected or failed call leaves the
//! action pending. Discarding an action teaches the false-positive
//! safelist. Re-resolving an already-resolved action is permitted and
//! re-applies its side effects.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use crate::store::types::{ActionStatus, UserStatus};
use crate::store::{ActionQueue, FalsePositiveStore, HistoryStore, SettingsStore};
use crate::twitch::ChatModerator;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Approved,
    Discarded,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManualAction {
    Ban,
    Timeout,
    Unban,
}

#[derive(Debug)]
pub enum ResolveError {
    /// The action id is unknown. Local condition, not fatal.
    NotFound,
    /// The chat platform rejected the moderation call; the action stays
    /// pending.
    Execution(anyhow::Error),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "action not found"),
            Self::Execution(e) => write!(f, "failed to execute moderation action: {e}"),
        }
    }
}

impl std::error::Error for ResolveError {}

pub struct ModerationService {
    actions: Arc<ActionQueue>,
    history: Arc<HistoryStore>,
    false_positives: Arc<FalsePositiveStore>,
    settings: Arc<SettingsStore>,
    chat: Arc<dyn ChatModerator>,
}

impl ModerationService {
    pub fn new(
        actions: Arc<ActionQueue>,
        history: Arc<HistoryStore>,
        false_positives: Arc<FalsePositiveStore>,
        settings: Arc<SettingsStore>,
        chat: Arc<dyn ChatModerator>,
    ) -> Self {
        Self {
            actions,
            history,
            false_positives,
            settings,
            chat,
        }
    }

    /// Resolve a queued action. `ban_duration` applies to approvals only:
    /// `"permanent"` bans, a positive number times out for that many
    /// seconds, and anything else falls back to the configured default
    /// timeout.
    pub async fn resolve(
        &self,
        id: &str,
        resolution: Resolution,
        ban_duration: Option<&str>,
    ) -> Result<(), ResolveError> {
        let action = self.actions.get(id).ok_or(ResolveError::NotFound)?;

        match resolution {
            Resolution::Discarded => {
                self.actions.resolve(id, ActionStatus::Discarded);
                self.false_positives.add(&action.message_content);
                info!(id, user = %action.username, "action discarded, learned as false positive");
                Ok(())
            }
            Resolution::Approved => {
                let reason = format!("Moderated: {}", action.flagged_reason);
                if ban_duration == Some("permanent") {
                    self.chat
                        .ban_user(&action.username, &reason)
                        .await
                        .map_err(ResolveError::Execution)?;
                    self.history
                        .update_user_status(&action.username, UserStatus::Banned);
                } else {
                    // Helix rejects zero-second timeouts, treat 0 like an
                    // absent duration.
                    let duration = ban_duration
                        .and_then(|d| d.parse::<u64>().ok())
                        .filter(|d| *d > 0)
                        .unwrap_or_else(|| self.settings.get().default_timeout_duration);
                    self.chat
                        .timeout_user(&action.username, duration, &reason)
                        .await
                        .map_err(ResolveError::Execution)?;
                    self.history
                        .update_user_status(&action.username, UserStatus::TimedOut);
                }
                self.actions.resolve(id, ActionStatus::Approved);
                info!(id, user = %action.username, "action approved and executed");
                Ok(())
            }
        }
    }

    /// Manual moderation from the live-users view, bypassing the queue.
    pub async fn moderate(&self, username: &str, action: ManualAction) -> Result<()> {
        match action {
            ManualAction::Ban => {
                self.chat.ban_user(username, "Manual Ban").await?;
                self.history.update_user_status(username, UserStatus::Banned);
            }
            ManualAction::Timeout => {
                let duration = self.settings.get().default_timeout_duration;
                self.chat
                    .timeout_user(username, duration, "Manual Timeout")
                    .await?;
                self.history
                    .update_user_status(username, UserStatus::TimedOut);
            }
            ManualAction::Unban => {
                self.chat.unban_user(username).await?;
                self.history.update_user_status(username, UserStatus::Active);
            }
        }
        Ok(())
    }
}
