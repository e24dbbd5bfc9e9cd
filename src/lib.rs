// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod metrics;
pub mod moderation;
pub mod queue;
pub mod store;
pub mod twitch;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::queue::AnalysisQueue;
pub use crate::store::types::ModerationResult;
