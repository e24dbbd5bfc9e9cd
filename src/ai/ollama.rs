//! Local-inference provider backed by an Ollama server.
//!
//! Ollama supports a JSON response format natively, so the raw response
//! content is parsed directly. Any failure along the way degrades to the
//! fail-open verdict.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::{parse_verdict, prompt, AiProvider};
use crate::store::types::ModerationResult;
use crate::store::{FalsePositiveStore, SettingsStore};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    settings: Arc<SettingsStore>,
    false_positives: Arc<FalsePositiveStore>,
}

impl OllamaProvider {
    pub fn new(
        model: String,
        settings: Arc<SettingsStore>,
        false_positives: Arc<FalsePositiveStore>,
    ) -> Self {
        let base_url = std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            // Local inference can be slow, but a hung server must not stall
            // the scheduler forever.
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            model,
            settings,
            false_positives,
        }
    }

    async fn analyze_impl(&self, message: &str, history: &[String]) -> Option<ModerationResult> {
        let language = self.settings.get().ai_language;
        let safelist = self.false_positives.get_all();
        let prompt = prompt::build_moderation_prompt(message, history, &safelist, &language);
        debug!(model = %self.model, "sending moderation prompt to ollama");

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            format: &'a str,
            stream: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            message: RespMsg,
        }
        #[derive(Deserialize)]
        struct RespMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            format: "json",
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&req)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let body: Resp = resp.json().await.ok()?;
        debug!(content = %body.message.content, "ollama response");
        parse_verdict(&body.message.content)
    }
}

#[async_trait]
impl AiProvider for OllamaProvider {
    async fn analyze_message(&self, message: &str, history: &[String]) -> ModerationResult {
        match self.analyze_impl(message, history).await {
            Some(verdict) => verdict,
            None => {
                warn!(model = %self.model, "ollama analysis failed, failing open");
                ModerationResult::analysis_failed()
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
