//! AI provider abstraction for chat moderation.
//!
//! Every provider answers `analyze_message` with a [`ModerationResult`] and
//! never errors: any network, HTTP, or parse failure collapses into the
//! fail-open `analysis_failed()` verdict so a broken backend can neither
//! auto-moderate nor wedge the pipeline.

pub mod google;
pub mod ollama;
pub mod prompt;
pub mod selector;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::types::ModerationResult;

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Analyze one (possibly batched) message with the given history lines
    /// as context.
    async fn analyze_message(&self, message: &str, history: &[String]) -> ModerationResult;

    /// Optional capability; providers without a cheap liveness probe keep
    /// the default.
    async fn health_check(&self) -> bool {
        true
    }

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn AiProvider>;

/// Markdown code fences some hosted models insist on wrapping JSON in.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\n?|\n?```").expect("fence regex"));

/// Parse a raw model response into a verdict, tolerating an optional
/// Markdown code-fence wrapper. `None` means the response was unusable.
pub fn parse_verdict(raw: &str) -> Option<ModerationResult> {
    let cleaned = CODE_FENCE.replace_all(raw, "");
    serde_json::from_str(cleaned.trim()).ok()
}
