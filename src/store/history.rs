//! Per-user chat history, bounded to the last 50 messages per user and
//! mirrored to a JSON file after every mutation.
//!
//! Persistence is fire-and-forget: the in-memory map is authoritative for
//! the running process, disk errors are logged and swallowed. A corrupt or
//! unreadable file at startup degrades to an empty store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, TimeZone};
use tracing::warn;

use super::types::{ChatMessage, ChatUser, UserStatus};

/// Hard cap on retained messages per user; oldest evicted first.
pub const MESSAGE_CAP: usize = 50;

#[derive(Debug)]
pub struct HistoryStore {
    users: Mutex<HashMap<String, ChatUser>>,
    path: PathBuf,
}

impl HistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let users = load_users(&path);
        Self {
            users: Mutex::new(users),
            path,
        }
    }

    /// Record a message, creating the user (status `active`) on first sight.
    pub fn add_message(&self, username: &str, content: &str) {
        let mut users = self.users.lock().expect("history mutex poisoned");
        let user = users
            .entry(username.to_string())
            .or_insert_with(|| ChatUser::new(username));

        user.messages.push(ChatMessage::new(username, content));
        if user.messages.len() > MESSAGE_CAP {
            let excess = user.messages.len() - MESSAGE_CAP;
            user.messages.drain(0..excess);
        }
        self.save(&users);
    }

    pub fn get_user(&self, username: &str) -> Option<ChatUser> {
        let users = self.users.lock().expect("history mutex poisoned");
        users.get(username).cloned()
    }

    /// Unordered snapshot; callers apply their own sort and filtering.
    pub fn get_all_users(&self) -> Vec<ChatUser> {
        let users = self.users.lock().expect("history mutex poisoned");
        users.values().cloned().collect()
    }

    /// Returns false if the user is unknown (no-op in that case).
    pub fn update_user_status(&self, username: &str, status: UserStatus) -> bool {
        let mut users = self.users.lock().expect("history mutex poisoned");
        match users.get_mut(username) {
            Some(user) => {
                user.status = status;
                self.save(&users);
                true
            }
            None => false,
        }
    }

    pub fn delete_user(&self, username: &str) -> bool {
        let mut users = self.users.lock().expect("history mutex poisoned");
        let removed = users.remove(username).is_some();
        if removed {
            self.save(&users);
        }
        removed
    }

    pub fn clear_all(&self) {
        let mut users = self.users.lock().expect("history mutex poisoned");
        users.clear();
        self.save(&users);
    }

    /// History rendered as `[HH:MM:SS] content` lines for the AI prompt.
    pub fn context_lines(&self, username: &str) -> Vec<String> {
        let users = self.users.lock().expect("history mutex poisoned");
        users
            .get(username)
            .map(|u| u.messages.iter().map(format_context_line).collect())
            .unwrap_or_default()
    }

    fn save(&self, users: &HashMap<String, ChatUser>) {
        let data: Vec<&ChatUser> = users.values().collect();
        let json = match serde_json::to_string_pretty(&data) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize user history");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to persist user history");
        }
    }
}

fn load_users(path: &Path) -> HashMap<String, ChatUser> {
    if !path.exists() {
        return HashMap::new();
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read user history, starting empty");
            return HashMap::new();
        }
    };
    match serde_json::from_str::<Vec<ChatUser>>(&raw) {
        Ok(data) => data.into_iter().map(|u| (u.username.clone(), u)).collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt user history, starting empty");
            HashMap::new()
        }
    }
}

fn format_context_line(msg: &ChatMessage) -> String {
    let time = Local
        .timestamp_millis_opt(msg.timestamp)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    format!("[{}] {}", time, msg.content)
}
