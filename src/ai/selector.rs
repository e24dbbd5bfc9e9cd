//! Lazy provider selection driven by the settings store.
//!
//! The active provider is keyed by a [`ProviderSpec`] derived from the
//! current settings; when the derived spec changes, the next analysis call
//! constructs and swaps in a fresh provider. Swapping is not synchronized
//! against in-flight calls: a call that already captured the old instance
//! completes against it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::ai::google::GoogleProvider;
use crate::ai::ollama::OllamaProvider;
use crate::ai::{AiProvider, DynProvider};
use crate::store::settings::AiSettings;
use crate::store::types::ModerationResult;
use crate::store::{FalsePositiveStore, SettingsStore};

/// Identity of a provider configuration. Compared structurally, so two
/// configs collide only when they really are the same provider/model/key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSpec {
    Ollama { model: String },
    Google { model: String, api_key: String },
}

impl ProviderSpec {
    pub fn from_settings(ai: &AiSettings) -> Self {
        match ai.provider.as_str() {
            "google" => Self::Google {
                model: ai.model.clone(),
                api_key: ai.api_key.clone(),
            },
            // Anything unrecognized falls back to local inference, matching
            // the default settings.
            _ => Self::Ollama {
                model: ai.model.clone(),
            },
        }
    }
}

pub struct ProviderSelector {
    settings: Arc<SettingsStore>,
    false_positives: Arc<FalsePositiveStore>,
    current: Mutex<Option<(ProviderSpec, DynProvider)>>,
}

impl ProviderSelector {
    pub fn new(settings: Arc<SettingsStore>, false_positives: Arc<FalsePositiveStore>) -> Self {
        Self {
            settings,
            false_positives,
            current: Mutex::new(None),
        }
    }

    /// The provider matching the current settings, rebuilt if they changed.
    pub fn current(&self) -> DynProvider {
        let spec = ProviderSpec::from_settings(&self.settings.get().ai);
        let mut current = self.current.lock().expect("selector mutex poisoned");
        match current.as_ref() {
            Some((active, provider)) if *active == spec => Arc::clone(provider),
            _ => {
                let provider = self.build(&spec);
                info!(provider = provider.name(), "switching AI provider");
                *current = Some((spec, Arc::clone(&provider)));
                provider
            }
        }
    }

    fn build(&self, spec: &ProviderSpec) -> DynProvider {
        match spec {
            ProviderSpec::Ollama { model } => Arc::new(OllamaProvider::new(
                model.clone(),
                Arc::clone(&self.settings),
                Arc::clone(&self.false_positives),
            )),
            ProviderSpec::Google { model, api_key } => Arc::new(GoogleProvider::new(
                model.clone(),
                api_key.clone(),
                Arc::clone(&self.settings),
                Arc::clone(&self.false_positives),
            )),
        }
    }
}

#[async_trait]
impl AiProvider for ProviderSelector {
    async fn analyze_message(&self, message: &str, history: &[String]) -> ModerationResult {
        self.current().analyze_message(message, history).await
    }

    async fn health_check(&self) -> bool {
        self.current().health_check().await
    }

    fn name(&self) -> &'static str {
        "selector"
    }
}
