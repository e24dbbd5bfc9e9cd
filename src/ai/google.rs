//! Cloud provider backed by the Google generative language API.
//!
//! Some hosted models (gemma families in particular) reject strict
//! JSON-mode requests with a 400, so the request relies on the prompt to
//! ask for JSON and the response text is fence-stripped before parsing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::{parse_verdict, prompt, AiProvider};
use crate::store::types::{ModerationResult, SuggestedAction};
use crate::store::{FalsePositiveStore, SettingsStore};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    http: reqwest::Client,
    model: String,
    api_key: String,
    settings: Arc<SettingsStore>,
    false_positives: Arc<FalsePositiveStore>,
}

impl GoogleProvider {
    pub fn new(
        model: String,
        api_key: String,
        settings: Arc<SettingsStore>,
        false_positives: Arc<FalsePositiveStore>,
    ) -> Self {
        if api_key.is_empty() {
            warn!("google provider selected but no API key configured");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self {
            http,
            model,
            api_key,
            settings,
            false_positives,
        }
    }

    async fn analyze_impl(&self, message: &str, history: &[String]) -> Option<ModerationResult> {
        let language = self.settings.get().ai_language;
        let safelist = self.false_positives.get_all();
        let prompt = prompt::build_moderation_prompt(message, history, &safelist, &language);
        debug!(model = %self.model, "sending moderation prompt to google");

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            BASE_URL, self.model, self.api_key
        );
        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let body: Resp = resp.json().await.ok()?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())?;
        debug!(content = %text, "google response");
        parse_verdict(text)
    }
}

#[async_trait]
impl AiProvider for GoogleProvider {
    async fn analyze_message(&self, message: &str, history: &[String]) -> ModerationResult {
        if self.api_key.is_empty() {
            return ModerationResult {
                flagged: false,
                reason: Some("AI Config Error".to_string()),
                suggested_action: SuggestedAction::None,
            };
        }
        match self.analyze_impl(message, history).await {
            Some(verdict) => verdict,
            None => {
                warn!(model = %self.model, "google analysis failed, failing open");
                ModerationResult::analysis_failed()
            }
        }
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
