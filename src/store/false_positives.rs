//! Safelist of messages a human explicitly dismissed as wrongly flagged.
//! Deduplicated by exact match, persisted as a flat JSON array of strings,
//! and only ever grows for the lifetime of the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

#[derive(Debug)]
pub struct FalsePositiveStore {
    examples: Mutex<Vec<String>>,
    path: PathBuf,
}

impl FalsePositiveStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let examples = load_examples(&path);
        Self {
            examples: Mutex::new(examples),
            path,
        }
    }

    /// Idempotent: exact duplicates are ignored.
    pub fn add(&self, message: &str) {
        let mut examples = self.examples.lock().expect("false-positive mutex poisoned");
        if examples.iter().any(|m| m == message) {
            return;
        }
        examples.push(message.to_string());
        self.save(&examples);
    }

    pub fn get_all(&self) -> Vec<String> {
        self.examples
            .lock()
            .expect("false-positive mutex poisoned")
            .clone()
    }

    fn save(&self, examples: &[String]) {
        let json = match serde_json::to_string_pretty(examples) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize false positives");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to persist false positives");
        }
    }
}

fn load_examples(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "corrupt false-positive file, starting empty");
            Vec::new()
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read false positives, starting empty");
            Vec::new()
        }
    }
}
