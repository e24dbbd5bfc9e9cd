//! Analysis queue: per-user message batching with FIFO admission and a
//! global rate limit on AI calls.
//!
//! AI inference is costly and possibly served by a single-threaded local
//! model, so the scheduler never invokes it per-message nor concurrently.
//! Messages from one user accumulate into a batch; users are admitted to
//! processing in the order their batch first became non-empty; at most one
//! analysis call runs at a time and calls are spaced by a 2-second global
//! cooldown. Each user's admitted batch is guaranteed eventual processing.
//!
//! Batches live only in memory: a crash drops any not-yet-analyzed batch
//! (history itself is persisted separately).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ai::DynProvider;
use crate::store::types::{ActionKind, PendingAction, SuggestedAction};
use crate::store::{ActionQueue, HistoryStore};

/// How often the background task polls the queue.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Minimum spacing between AI calls, measured from when the previous call
/// settled. Global across all users.
pub const ANALYSIS_COOLDOWN: Duration = Duration::from_secs(2);

/// Separator used to join a batch into one analyzable text blob.
pub const BATCH_SEPARATOR: &str = " . ";

#[derive(Debug, Default)]
struct QueueState {
    /// Not-yet-analyzed messages per user, arrival order.
    batches: HashMap<String, Vec<String>>,
    /// FIFO admission order: first user with a pending batch is dequeued first.
    order: VecDeque<String>,
}

pub struct AnalysisQueue {
    state: Mutex<QueueState>,
    /// At most one processing step at a time.
    processing: AtomicBool,
    last_call: Mutex<Option<Instant>>,
    history: Arc<HistoryStore>,
    actions: Arc<ActionQueue>,
    provider: DynProvider,
}

impl AnalysisQueue {
    pub fn new(
        history: Arc<HistoryStore>,
        actions: Arc<ActionQueue>,
        provider: DynProvider,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            processing: AtomicBool::new(false),
            last_call: Mutex::new(None),
            history,
            actions,
            provider,
        })
    }

    /// Queue a message for analysis. Rapid messages from the same user merge
    /// into one batch; a user mid-processing starts a fresh batch instead of
    /// racing the in-flight one.
    pub fn add(&self, username: &str, message: &str) {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        match state.batches.get_mut(username) {
            Some(batch) => batch.push(message.to_string()),
            None => {
                state
                    .batches
                    .insert(username.to_string(), vec![message.to_string()]);
                state.order.push_back(username.to_string());
            }
        }
        gauge!("analysis_queue_depth").set(state.order.len() as f64);
    }

    /// Number of users currently awaiting analysis.
    pub fn queued_users(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").order.len()
    }

    /// One scheduler step. Does nothing while a step is in flight, while the
    /// queue is empty, or within the cooldown window.
    pub async fn tick(&self) {
        if self.processing.load(Ordering::Acquire) {
            return;
        }
        {
            let last_call = self.last_call.lock().expect("cooldown mutex poisoned");
            if let Some(last) = *last_call {
                if last.elapsed() < ANALYSIS_COOLDOWN {
                    return;
                }
            }
        }
        if self.state.lock().expect("queue mutex poisoned").order.is_empty() {
            return;
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        // Resets the cooldown clock and the processing flag on every exit
        // path, including panics inside the provider.
        let _guard = StepGuard { queue: self };
        self.process_next().await;
    }

    async fn process_next(&self) {
        let (username, batch) = {
            let mut state = self.state.lock().expect("queue mutex poisoned");
            let Some(username) = state.order.pop_front() else {
                return;
            };
            let batch = state.batches.remove(&username).unwrap_or_default();
            gauge!("analysis_queue_depth").set(state.order.len() as f64);
            (username, batch)
        };
        if batch.is_empty() {
            return;
        }

        let text = batch.join(BATCH_SEPARATOR);
        let context = self.history.context_lines(&username);

        let verdict = self.provider.analyze_message(&text, &context).await;
        counter!("analysis_runs_total").increment(1);

        if verdict.flagged {
            let reason = verdict.reason.unwrap_or_else(|| "Unknown".to_string());
            let kind = match verdict.suggested_action {
                SuggestedAction::Ban => ActionKind::Ban,
                _ => ActionKind::Timeout,
            };
            info!(user = %username, %reason, ?kind, "message flagged, queueing action");
            counter!("analysis_flagged_total").increment(1);
            self.actions
                .add(PendingAction::new(&username, &text, &reason, kind));
        } else {
            debug!(user = %username, "message batch judged safe");
        }
    }

    /// Spawn the periodic tick loop.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            loop {
                ticker.tick().await;
                queue.tick().await;
            }
        })
    }
}

struct StepGuard<'a> {
    queue: &'a AnalysisQueue,
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        *self
            .queue
            .last_call
            .lock()
            .expect("cooldown mutex poisoned") = Some(Instant::now());
        self.queue.processing.store(false, Ordering::Release);
    }
}
