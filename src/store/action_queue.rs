//! Human-in-the-loop boundary: moderation actions awaiting approval.
//!
//! Entries are never deleted; resolved actions stay in the list as an
//! audit trail for the process lifetime and are merely filtered out of
//! the pending view.

use std::sync::Mutex;

use super::types::{ActionStatus, PendingAction};

#[derive(Debug, Default)]
pub struct ActionQueue {
    queue: Mutex<Vec<PendingAction>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unconditionally; the queue does not deduplicate.
    pub fn add(&self, action: PendingAction) {
        self.queue
            .lock()
            .expect("action queue mutex poisoned")
            .push(action);
    }

    /// Pending actions in arrival order.
    pub fn get_pending(&self) -> Vec<PendingAction> {
        self.queue
            .lock()
            .expect("action queue mutex poisoned")
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<PendingAction> {
        self.queue
            .lock()
            .expect("action queue mutex poisoned")
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    /// Returns false if the id is unknown. Already-resolved actions may be
    /// re-resolved; callers own that policy.
    pub fn resolve(&self, id: &str, status: ActionStatus) -> bool {
        let mut queue = self.queue.lock().expect("action queue mutex poisoned");
        match queue.iter_mut().find(|a| a.id == id) {
            Some(action) => {
                action.status = status;
                true
            }
            None => false,
        }
    }
}
