//! Persistent and in-memory state owned by the process: chat history,
//! the learned false-positive safelist, the action queue, and settings.

pub mod action_queue;
pub mod false_positives;
pub mod history;
pub mod secrets;
pub mod settings;
pub mod types;

pub use action_queue::ActionQueue;
pub use false_positives::FalsePositiveStore;
pub use history::{HistoryStore, MESSAGE_CAP};
pub use settings::{AiSettings, AppSettings, SettingsStore, TwitchSettings};
pub use types::{
    ActionKind, ActionStatus, ChatMessage, ChatUser, ModerationResult, PendingAction,
    SuggestedAction, UserStatus,
};
