//! Reactions
//!
//! A reaction is a durable identity wrapped around a user computation. The
//! computation's reads are tracked every time it runs through the runtime,
//! and it is re-run (or handed to its scheduler) when any of them change.
//!
//! Each reaction mirrors the edges it holds in the dependency store so that
//! all of them can be released in one pass before the next run.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::runtime::{Runtime, RuntimeInner};
use super::scheduler::Scheduler;
use crate::error::Result;
use crate::graph::{Edge, Operation};
use crate::value::Value;

/// The computation behind a reaction.
pub type ReactionFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Hook invoked with every operation that involves a reaction: reads it
/// records and mutations that trigger it.
pub type Debugger = Arc<dyn Fn(&Operation) + Send + Sync>;

/// Unique identifier for a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionId(u64);

impl ReactionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reaction#{}", self.0)
    }
}

#[derive(Default)]
struct Hooks {
    scheduler: Scheduler,
    debugger: Option<Debugger>,
}

pub(crate) struct ReactionInner {
    id: ReactionId,
    runtime: Weak<RuntimeInner>,
    compute: Box<ReactionFn>,
    hooks: RwLock<Hooks>,
    deactivated: AtomicBool,
    /// Reverse index of the edges this reaction holds in the store.
    edges: Mutex<SmallVec<[Edge; 8]>>,
    run_count: AtomicUsize,
}

impl Drop for ReactionInner {
    fn drop(&mut self) {
        let edges = std::mem::take(self.edges.get_mut());
        if edges.is_empty() {
            return;
        }
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.store.lock().release(self.id, edges);
        }
    }
}

/// Handle to a tracked computation.
///
/// Cloning the handle shares the reaction. Reactions compare and hash by id.
/// The dependency store only holds reactions weakly: once every handle is
/// dropped the reaction's edges are released, as if it had been unobserved.
#[derive(Clone)]
pub struct Reaction(Arc<ReactionInner>);

/// Non-owning handle to a reaction.
#[derive(Clone)]
pub struct WeakReaction(Weak<ReactionInner>);

impl WeakReaction {
    pub fn upgrade(&self) -> Option<Reaction> {
        self.0.upgrade().map(Reaction)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Reaction {
    pub(crate) fn new<F>(runtime: Weak<RuntimeInner>, compute: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(ReactionInner {
            id: ReactionId::next(),
            runtime,
            compute: Box::new(compute),
            hooks: RwLock::new(Hooks::default()),
            deactivated: AtomicBool::new(false),
            edges: Mutex::new(SmallVec::new()),
            run_count: AtomicUsize::new(0),
        }))
    }

    pub fn id(&self) -> ReactionId {
        self.0.id
    }

    /// Run the reaction with no arguments, re-tracking its dependencies.
    ///
    /// Returns `Ok(None)` when the call was skipped because the reaction is
    /// already running further up the execution stack.
    pub fn call(&self) -> Result<Option<Value>> {
        self.call_with(&[])
    }

    /// Run the reaction with arguments, re-tracking its dependencies.
    pub fn call_with(&self, args: &[Value]) -> Result<Option<Value>> {
        match self.0.runtime.upgrade() {
            Some(inner) => Runtime::from_inner(inner).run(self, args),
            None => self.invoke(args).map(Some),
        }
    }

    /// Whether the reaction still tracks and gets notified.
    pub fn is_active(&self) -> bool {
        !self.0.deactivated.load(Ordering::SeqCst)
    }

    pub fn scheduler(&self) -> Scheduler {
        self.0.hooks.read().scheduler.clone()
    }

    pub fn debugger(&self) -> Option<Debugger> {
        self.0.hooks.read().debugger.clone()
    }

    /// Number of edges currently held.
    pub fn dependency_count(&self) -> usize {
        self.0.edges.lock().len()
    }

    /// Number of times the computation has been invoked.
    pub fn run_count(&self) -> usize {
        self.0.run_count.load(Ordering::SeqCst)
    }

    pub fn downgrade(&self) -> WeakReaction {
        WeakReaction(Arc::downgrade(&self.0))
    }

    pub(crate) fn belongs_to(&self, runtime: &Arc<RuntimeInner>) -> bool {
        std::ptr::eq(self.0.runtime.as_ptr(), Arc::as_ptr(runtime))
    }

    /// Invoke the computation directly, without touching the execution stack.
    pub(crate) fn invoke(&self, args: &[Value]) -> Result<Value> {
        self.0.run_count.fetch_add(1, Ordering::SeqCst);
        (self.0.compute)(args)
    }

    pub(crate) fn set_hooks(&self, scheduler: Scheduler, debugger: Option<Debugger>) {
        let mut hooks = self.0.hooks.write();
        hooks.scheduler = scheduler;
        hooks.debugger = debugger;
    }

    /// Mark the reaction deactivated. Returns `false` if it already was.
    pub(crate) fn deactivate(&self) -> bool {
        !self.0.deactivated.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn push_edge(&self, edge: Edge) {
        self.0.edges.lock().push(edge);
    }

    pub(crate) fn take_edges(&self) -> SmallVec<[Edge; 8]> {
        std::mem::take(&mut *self.0.edges.lock())
    }
}

impl PartialEq for Reaction {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Reaction {}

impl Hash for Reaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.0.id)
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}
