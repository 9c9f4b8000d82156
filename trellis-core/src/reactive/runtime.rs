//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects wrapped views,
//! the dependency store and reactions.
//!
//! # How It Works
//!
//! 1. Wrapping a raw object registers it in the identity registry and
//!    returns a view whose traps report to this runtime.
//!
//! 2. While a reaction runs, the traps of every view it reads through call
//!    [`Runtime::track`], which records an edge for the innermost running
//!    reaction.
//!
//! 3. When a view is written, its trap calls [`Runtime::trigger`], which:
//!    a. Looks up the reactions registered for the touched key
//!    b. Passes each one to its debugger
//!    c. Runs it, calls its scheduler callback, or queues it
//!
//! 4. Before a reaction runs it drops all of its edges, so the edges it
//!    holds afterwards are exactly the reads of that run.
//!
//! # State
//!
//! Everything lives behind an `Arc` owned by the [`Runtime`] handle rather
//! than in globals, so independent runtimes can coexist and tear down
//! deterministically. The identity registry and dependency store are behind
//! mutexes, execution stacks are per thread, and no lock is held while user
//! code runs.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::context::{DebugScope, ExecutionContext, ExecutionStacks};
use super::observer::{IntoReaction, ObserveOptions};
use super::reaction::Reaction;
use super::scheduler::Scheduler;
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::graph::{DependencyKey, DependencyStore, Operation};
use crate::intercept::{
    BaseHandlers, DefaultPolicy, IdentityRegistry, InstrumentationPolicy, Observable, TrapSet,
};
use crate::value::{ObjectRef, PropertyKey, Value};

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    policy: Arc<dyn InstrumentationPolicy>,
    default_handlers: Arc<dyn TrapSet>,
    pub(crate) registry: Mutex<IdentityRegistry>,
    pub(crate) store: Mutex<DependencyStore>,
    pub(crate) stacks: ExecutionStacks,
}

/// Handle to a reactive runtime.
///
/// Cloning the handle shares the runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

/// Builder for a [`Runtime`] with a custom configuration or policy.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    policy: Option<Arc<dyn InstrumentationPolicy>>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Decide which objects get wrapped and with which trap set.
    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: InstrumentationPolicy + 'static,
    {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            inner: Arc::new(RuntimeInner {
                config: self.config,
                policy: self.policy.unwrap_or_else(|| Arc::new(DefaultPolicy)),
                default_handlers: Arc::new(BaseHandlers),
                registry: Mutex::new(IdentityRegistry::new()),
                store: Mutex::new(DependencyStore::new()),
                stacks: ExecutionStacks::new(),
            }),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration and policy.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub(crate) fn from_inner(inner: Arc<RuntimeInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Wrap a value in a view.
    ///
    /// Views and primitives come back unchanged, as do objects the policy
    /// refuses. Wrapping the same raw object twice yields the same view.
    pub fn wrap(&self, value: impl Into<Value>) -> Value {
        match value.into() {
            Value::Object(object) => match self.instrument(&object) {
                Some(view) => Value::View(view),
                None => Value::Object(object),
            },
            other => other,
        }
    }

    /// Wrap a raw object, failing if the policy refuses it.
    pub fn observable(&self, object: impl Into<ObjectRef>) -> Result<Observable> {
        let object = object.into();
        self.instrument(&object)
            .ok_or_else(|| Error::NotInstrumentable(object.id().raw()))
    }

    /// Build a raw object graph from JSON and wrap its root.
    pub fn observable_from_json(&self, json: serde_json::Value) -> Result<Observable> {
        match Value::from_json(json) {
            Value::Object(object) => self.observable(object),
            other => Err(Error::NotAnObject(other.type_name())),
        }
    }

    /// Whether `value` is a view.
    pub fn is_wrapped(&self, value: &Value) -> bool {
        value.is_view()
    }

    /// The raw object behind a view; anything else unchanged.
    pub fn unwrap(&self, value: Value) -> Value {
        value.unwrapped()
    }

    fn instrument(&self, object: &ObjectRef) -> Option<Observable> {
        if !self.inner.policy.should_instrument(object) {
            return None;
        }
        if let Some(view) = self.cached_view(object) {
            return Some(view);
        }

        let handlers = self
            .inner
            .policy
            .handlers(object)
            .unwrap_or_else(|| self.inner.default_handlers.clone());
        let (handlers, purge_due) = {
            let mut registry = self.inner.registry.lock();
            let handlers = registry.register(object, handlers);
            let interval = self.inner.config.purge_interval;
            (handlers, interval > 0 && registry.registrations_since_purge() >= interval)
        };
        if purge_due {
            self.purge();
        }
        Some(Observable::new(self.clone(), object.clone(), handlers))
    }

    /// The existing view of a raw object, without creating one.
    pub fn cached_view(&self, object: &ObjectRef) -> Option<Observable> {
        let handlers = self.inner.registry.lock().lookup(object)?;
        Some(Observable::new(self.clone(), object.clone(), handlers))
    }

    /// Drop registry and store entries of raw objects that no longer exist.
    /// Returns the number of entries reclaimed.
    pub fn purge(&self) -> usize {
        let views = self.inner.registry.lock().purge();
        let targets = self.inner.store.lock().purge();
        if views + targets > 0 {
            debug!(views, targets, "purged dead registry entries");
        }
        views + targets
    }

    /// Number of raw objects with a live view.
    pub fn wrapped_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    /// Create a reaction bound to this runtime without running it.
    pub fn reaction<F>(&self, compute: F) -> Reaction
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Reaction::new(Arc::downgrade(&self.inner), compute)
    }

    /// Turn a computation into a tracked reaction.
    ///
    /// An existing reaction is reused with the new options. Unless
    /// `options.lazy` is set the reaction runs once right away, which also
    /// establishes its first dependency set; a failure of that run is
    /// returned.
    pub fn observe<R>(&self, computation: R, options: ObserveOptions) -> Result<Reaction>
    where
        R: IntoReaction,
    {
        let reaction = computation.into_reaction(self);
        debug_assert!(
            reaction.belongs_to(&self.inner),
            "reaction {} was created by another runtime",
            reaction.id()
        );
        reaction.set_hooks(options.scheduler, options.debugger);
        debug!(reaction = %reaction.id(), lazy = options.lazy, "observing");

        if !options.lazy {
            reaction.call()?;
        }
        Ok(reaction)
    }

    /// Permanently deactivate a reaction.
    ///
    /// Its edges are released, later calls run the computation untracked,
    /// and a pending run in its queue is cancelled.
    pub fn unobserve(&self, reaction: &Reaction) {
        if reaction.deactivate() {
            self.release(reaction);
            debug!(reaction = %reaction.id(), "unobserved");
        }
        if let Scheduler::Queue(queue) = reaction.scheduler() {
            queue.remove(reaction);
        }
    }

    /// Run a reaction's computation with dependency tracking.
    pub(crate) fn run(&self, reaction: &Reaction, args: &[Value]) -> Result<Option<Value>> {
        if !reaction.is_active() {
            return reaction.invoke(args).map(Some);
        }
        // TODO: allow explicitly recursive reactions instead of skipping them.
        if self.inner.stacks.contains(reaction) {
            trace!(reaction = %reaction.id(), "skipping re-entrant run");
            return Ok(None);
        }

        self.release(reaction);
        let _ctx = ExecutionContext::enter(&self.inner.stacks, reaction.clone());
        trace!(reaction = %reaction.id(), depth = self.inner.stacks.depth(), "running");
        reaction.invoke(args).map(Some)
    }

    fn release(&self, reaction: &Reaction) {
        let edges = reaction.take_edges();
        if !edges.is_empty() {
            self.inner.store.lock().release(reaction.id(), edges);
        }
    }

    /// Whether a reaction is running on this thread.
    pub fn is_tracking(&self) -> bool {
        self.inner.stacks.is_active()
    }

    /// The innermost reaction running on this thread.
    pub fn current_reaction(&self) -> Option<Reaction> {
        self.inner.stacks.current()
    }

    // ------------------------------------------------------------------
    // Tracking and notification
    // ------------------------------------------------------------------

    /// Record a read for the innermost running reaction, if any.
    pub fn track(&self, operation: &Operation) {
        let Some(reaction) = self.inner.stacks.current() else {
            return;
        };
        if self.inner.config.trace_operations {
            trace!(reaction = %reaction.id(), %operation, "track");
        }
        self.debug(&reaction, operation);
        self.inner.store.lock().record(&reaction, operation);
    }

    /// Dispatch a mutation to every reaction that depends on it.
    ///
    /// Reactions are visited in registration order. A reaction deactivated
    /// by an earlier one in the same dispatch is skipped. Failures of
    /// immediately re-run reactions are logged, not returned: the write that
    /// caused them has already happened.
    pub fn trigger(&self, operation: &Operation) {
        let reactions = self.inner.store.lock().reactions_for(operation);
        if self.inner.config.trace_operations {
            trace!(%operation, count = reactions.len(), "trigger");
        }
        for reaction in reactions {
            if !reaction.is_active() {
                continue;
            }
            self.debug(&reaction, operation);
            self.dispatch(&reaction);
        }
    }

    fn dispatch(&self, reaction: &Reaction) {
        match reaction.scheduler() {
            Scheduler::Callback(schedule) => schedule(reaction),
            Scheduler::Queue(queue) => {
                queue.add(reaction.clone());
            }
            Scheduler::Immediate => {
                if let Err(err) = reaction.call() {
                    tracing::error!(reaction = %reaction.id(), error = %err, "reaction failed");
                }
            }
        }
    }

    fn debug(&self, reaction: &Reaction, operation: &Operation) {
        let Some(debugger) = reaction.debugger() else {
            return;
        };
        if let Some(_scope) = DebugScope::enter(&self.inner.stacks) {
            debugger(operation);
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of live reactions depending on `target[key]`.
    pub fn dependents(&self, target: &ObjectRef, key: impl Into<PropertyKey>) -> usize {
        let key = DependencyKey::Property(key.into());
        self.inner.store.lock().dependents(target, &key)
    }

    /// Number of live reactions depending on the key set of `target`.
    pub fn iteration_dependents(&self, target: &ObjectRef) -> usize {
        let key = DependencyKey::iteration_of(target);
        self.inner.store.lock().dependents(target, &key)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("wrapped", &self.wrapped_count())
            .field("tracked_targets", &self.inner.store.lock().target_count())
            .finish()
    }
}
