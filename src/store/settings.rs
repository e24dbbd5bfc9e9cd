//! Application settings: AI provider selection, moderation defaults, and
//! Twitch credentials. Persisted encrypted at rest (see `secrets`), loaded
//! fail-open — any problem with the file degrades to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::secrets::{self, SecretEnvelope};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    /// "ollama" | "google"
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "gemma3:4b".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitchSettings {
    pub username: String,
    pub channel: String,
    pub client_id: String,
    pub client_secret: String,
    /// User access token obtained out-of-band (OAuth flow is not part of
    /// this crate).
    pub oauth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub ai_language: String,
    pub default_timeout_duration: u64,
    pub is_setup_complete: bool,
    pub ai: AiSettings,
    pub twitch: TwitchSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ai_language: "English".to_string(),
            default_timeout_duration: 600,
            is_setup_complete: false,
            ai: AiSettings::default(),
            twitch: TwitchSettings::default(),
        }
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    settings: Mutex<AppSettings>,
    path: PathBuf,
    key: [u8; 32],
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let key = secrets::derive_machine_key();
        let settings = load_settings(&path, &key);
        Self {
            settings: Mutex::new(settings),
            path,
            key,
        }
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> AppSettings {
        self.settings
            .lock()
            .expect("settings mutex poisoned")
            .clone()
    }

    /// Mutate-and-persist. The closure sees the live settings under the lock.
    pub fn update<F: FnOnce(&mut AppSettings)>(&self, f: F) {
        let mut settings = self.settings.lock().expect("settings mutex poisoned");
        f(&mut settings);
        self.save(&settings);
    }

    fn save(&self, settings: &AppSettings) {
        let plain = match serde_json::to_string(settings) {
            Ok(plain) => plain,
            Err(e) => {
                warn!(error = %e, "failed to serialize settings");
                return;
            }
        };
        let envelope = match secrets::seal(&plain, &self.key) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "failed to encrypt settings");
                return;
            }
        };
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "failed to persist settings");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize settings envelope"),
        }
    }
}

fn load_settings(path: &Path, key: &[u8; 32]) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read settings, using defaults");
            return AppSettings::default();
        }
    };
    let envelope: SecretEnvelope = match serde_json::from_str(&raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt settings envelope, using defaults");
            return AppSettings::default();
        }
    };
    let plain = match secrets::open(&envelope, key) {
        Ok(plain) => plain,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot decrypt settings, using defaults");
            return AppSettings::default();
        }
    };
    serde_json::from_str(&plain).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "corrupt settings payload, using defaults");
        AppSettings::default()
    })
}
