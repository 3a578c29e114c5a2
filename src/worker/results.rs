//! Completed-task storage and cancellation reconciliation: the store lock
//! domain, independent of the queue lock.
//!
//! `live` tracks handles between submission and completion so `cancel` can
//! tell a queued/running task apart from an unknown or already-consumed
//! handle. An entry in `pending_cancel` exists only while its task is still
//! live and is consumed exactly once, when the matching task completes; the
//! outcome is then discarded instead of stored.

use std::collections::{HashMap, HashSet};

use crate::core::{CompressedOutput, TaskHandle};
use crate::utils::CodecError;

/// Outcome of one finished task: payload or the transform failure.
pub(crate) type TaskOutcome = Result<CompressedOutput, CodecError>;

pub(crate) struct ResultStore {
    finished: HashMap<TaskHandle, TaskOutcome>,
    pending_cancel: HashSet<TaskHandle>,
    live: HashSet<TaskHandle>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            finished: HashMap::new(),
            pending_cancel: HashSet::new(),
            live: HashSet::new(),
        }
    }

    /// Marks a freshly issued handle as live. Must happen before the task
    /// becomes visible to any worker.
    pub fn register(&mut self, handle: TaskHandle) {
        self.live.insert(handle);
    }

    /// Removes a handle that never made it into the queue.
    pub fn unregister(&mut self, handle: TaskHandle) {
        self.live.remove(&handle);
    }

    /// Reconciles a finished task against pending cancellations.
    ///
    /// Returns `false` when the outcome was discarded because the handle had
    /// been cancelled while the task was still queued or running.
    pub fn complete(&mut self, handle: TaskHandle, outcome: TaskOutcome) -> bool {
        self.live.remove(&handle);
        if self.pending_cancel.remove(&handle) {
            return false;
        }
        self.finished.insert(handle, outcome);
        true
    }

    /// Non-consuming check for a finished entry.
    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.finished.contains_key(&handle)
    }

    /// One-time retrieval: removes and returns the finished entry.
    pub fn take(&mut self, handle: TaskHandle) -> Option<TaskOutcome> {
        self.finished.remove(&handle)
    }

    /// Erases a finished entry, or records a pending cancellation for a
    /// still-live handle. Anything else is a no-op.
    pub fn cancel(&mut self, handle: TaskHandle) {
        if self.finished.remove(&handle).is_some() {
            return;
        }
        if self.live.contains(&handle) {
            self.pending_cancel.insert(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> TaskOutcome {
        Ok(CompressedOutput::Bytes(vec![1, 2, 3]))
    }

    fn handle(n: u32) -> TaskHandle {
        let mut handle = TaskHandle::first();
        for _ in 1..n {
            handle = handle.next();
        }
        handle
    }

    #[test]
    fn complete_then_take_consumes_the_entry() {
        let mut store = ResultStore::new();
        let h = handle(1);
        store.register(h);

        assert!(!store.contains(h));
        assert!(store.complete(h, outcome()));
        assert!(store.contains(h));

        assert!(store.take(h).is_some());
        assert!(!store.contains(h));
        assert!(store.take(h).is_none());
    }

    #[test]
    fn cancel_before_completion_discards_the_outcome() {
        let mut store = ResultStore::new();
        let h = handle(1);
        store.register(h);

        store.cancel(h);
        assert!(!store.complete(h, outcome()));
        assert!(!store.contains(h));
        assert!(store.take(h).is_none());
    }

    #[test]
    fn pending_cancellation_is_consumed_exactly_once() {
        let mut store = ResultStore::new();
        let h = handle(1);
        store.register(h);
        store.cancel(h);
        assert!(!store.complete(h, outcome()));

        // A later task reusing nothing: completing again (cannot happen in
        // the engine, but the set must not remember the old cancellation).
        store.register(h);
        assert!(store.complete(h, outcome()));
    }

    #[test]
    fn cancel_finished_entry_erases_it() {
        let mut store = ResultStore::new();
        let h = handle(2);
        store.register(h);
        store.complete(h, outcome());

        store.cancel(h);
        assert!(!store.contains(h));
        assert!(store.take(h).is_none());
    }

    #[test]
    fn cancel_unknown_or_consumed_handle_is_a_noop() {
        let mut store = ResultStore::new();
        store.cancel(TaskHandle::INVALID);
        store.cancel(handle(7));
        assert!(store.pending_cancel.is_empty());

        let h = handle(1);
        store.register(h);
        store.complete(h, outcome());
        store.take(h);
        store.cancel(h);
        assert!(store.pending_cancel.is_empty());
    }
}
