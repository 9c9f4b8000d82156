//! Reaction Scheduling
//!
//! When a mutation reaches a reaction, the reaction's scheduler decides what
//! happens next:
//!
//! - [`Scheduler::Immediate`] re-runs it synchronously, inside the write.
//! - [`Scheduler::Callback`] hands it to a user function.
//! - [`Scheduler::Queue`] adds it to a [`ReactionQueue`]. Adding a reaction
//!   that is already queued is a no-op, so any number of triggers between
//!   two flushes collapse into one run.
//!
//! When a queue is flushed is the caller's business: a frame tick, the end
//! of a request, a task spawned on an executor.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use super::reaction::Reaction;
use crate::error::Result;

/// Strategy controlling how a triggered reaction is executed.
#[derive(Clone, Default)]
pub enum Scheduler {
    /// Run synchronously in the context of the triggering mutation.
    #[default]
    Immediate,
    /// Pass the reaction to a function.
    Callback(Arc<dyn Fn(&Reaction) + Send + Sync>),
    /// Add the reaction to a deduplicating queue.
    Queue(ReactionQueue),
}

impl Scheduler {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Reaction) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn queue(queue: &ReactionQueue) -> Self {
        Self::Queue(queue.clone())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("Immediate"),
            Self::Callback(_) => f.write_str("Callback"),
            Self::Queue(queue) => f.debug_tuple("Queue").field(&queue.len()).finish(),
        }
    }
}

/// A shared, insertion-ordered set of pending reactions.
///
/// Clones share the same pending set.
#[derive(Clone, Default)]
pub struct ReactionQueue {
    pending: Arc<Mutex<IndexSet<Reaction>>>,
}

impl ReactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reaction. Returns `false` if it was already pending.
    pub fn add(&self, reaction: Reaction) -> bool {
        self.pending.lock().insert(reaction)
    }

    /// Cancel a pending run. Returns `false` if it was not pending.
    pub fn remove(&self, reaction: &Reaction) -> bool {
        self.pending.lock().shift_remove(reaction)
    }

    pub fn contains(&self, reaction: &Reaction) -> bool {
        self.pending.lock().contains(reaction)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Take every pending reaction, oldest first.
    pub fn drain(&self) -> Vec<Reaction> {
        self.pending.lock().drain(..).collect()
    }

    /// Run every reaction that was pending when the flush started.
    ///
    /// Reactions queued by those runs stay pending for the next flush. All
    /// drained reactions run even if one fails; the first failure is
    /// returned. Returns the number of reactions run.
    pub fn flush(&self) -> Result<usize> {
        let batch = self.drain();
        if batch.is_empty() {
            return Ok(0);
        }
        debug!(count = batch.len(), "flushing reaction queue");

        let mut first_error = None;
        for reaction in &batch {
            if let Err(err) = reaction.call() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(batch.len()),
        }
    }
}

impl fmt::Debug for ReactionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionQueue").field("pending", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reactive::Runtime;
    use crate::value::Value;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn queue_deduplicates_and_keeps_order() {
        let runtime = Runtime::new();
        let a = runtime.reaction(|_| Ok(Value::Undefined));
        let b = runtime.reaction(|_| Ok(Value::Undefined));
        let queue = ReactionQueue::new();

        assert!(queue.add(b.clone()));
        assert!(queue.add(a.clone()));
        assert!(!queue.add(b.clone()));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained, vec![b, a]);
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_runs_each_pending_reaction_once() {
        let runtime = Runtime::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        let reaction = runtime.reaction(move |_| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        });
        let queue = ReactionQueue::new();
        queue.add(reaction.clone());
        queue.add(reaction);

        assert_eq!(queue.flush().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.flush().unwrap(), 0);
    }

    #[test]
    fn flush_reports_first_failure_after_running_everything() {
        let runtime = Runtime::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        let failing = runtime.reaction(|_| Err(Error::computation("first")));
        let healthy = runtime.reaction(move |_| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        });
        let queue = ReactionQueue::new();
        queue.add(failing);
        queue.add(healthy);

        assert!(queue.flush().is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_cancels_pending_run() {
        let runtime = Runtime::new();
        let reaction = runtime.reaction(|_| Ok(Value::Undefined));
        let queue = ReactionQueue::new();
        queue.add(reaction.clone());
        assert!(queue.contains(&reaction));
        assert!(queue.remove(&reaction));
        assert!(!queue.remove(&reaction));
        assert!(queue.is_empty());
    }
}
