//! Observer API
//!
//! The public surface for turning computations into reactions and for
//! retiring them. See [`Runtime::observe`] and [`Runtime::unobserve`].

use std::fmt;
use std::sync::Arc;

use super::reaction::{Debugger, Reaction};
use super::runtime::Runtime;
use super::scheduler::Scheduler;
use crate::error::Result;
use crate::graph::Operation;
use crate::value::Value;

/// Options for [`Runtime::observe`].
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::{ObserveOptions, ReactionQueue, Scheduler};
///
/// let queue = ReactionQueue::new();
/// let options = ObserveOptions::new()
///     .lazy()
///     .scheduler(Scheduler::queue(&queue))
///     .debugger(|operation| eprintln!("{operation}"));
/// assert!(options.lazy);
/// ```
#[derive(Clone, Default)]
pub struct ObserveOptions {
    /// Skip the initial run.
    pub lazy: bool,
    pub scheduler: Scheduler,
    pub debugger: Option<Debugger>,
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn debugger<F>(mut self, debugger: F) -> Self
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.debugger = Some(Arc::new(debugger));
        self
    }
}

impl fmt::Debug for ObserveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler)
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}

/// Things [`Runtime::observe`] accepts: a computation to wrap in a new
/// reaction, or an existing reaction to reuse.
pub trait IntoReaction {
    fn into_reaction(self, runtime: &Runtime) -> Reaction;
}

impl<F> IntoReaction for F
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    fn into_reaction(self, runtime: &Runtime) -> Reaction {
        runtime.reaction(self)
    }
}

impl IntoReaction for Reaction {
    fn into_reaction(self, _runtime: &Runtime) -> Reaction {
        self
    }
}
