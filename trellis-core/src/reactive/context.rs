//! Execution Context
//!
//! The execution context tracks which reactions are currently running.
//! Reads are attributed to the innermost one; a reaction that calls another
//! reaction pushes a second entry and gets its own reads back once the inner
//! one returns.
//!
//! # Implementation
//!
//! Each runtime keeps one stack per thread, so two threads running reactions
//! on the same runtime never see each other's entries. Entering a context
//! returns a guard that pops the stack when dropped. The stack is therefore
//! restored on every exit path, including failures and panics.
//!
//! The same per-thread state carries the "debugger running" flag, which
//! keeps a debugger that touches observables from recursing into itself.

use std::thread::{self, ThreadId};

use dashmap::DashMap;

use super::reaction::{Reaction, ReactionId};

#[derive(Default)]
struct ExecutionState {
    stack: Vec<Reaction>,
    debugging: bool,
}

impl ExecutionState {
    fn is_idle(&self) -> bool {
        self.stack.is_empty() && !self.debugging
    }
}

/// Per-thread execution stacks of one runtime.
#[derive(Default)]
pub(crate) struct ExecutionStacks {
    states: DashMap<ThreadId, ExecutionState>,
}

impl ExecutionStacks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The innermost running reaction on this thread.
    pub(crate) fn current(&self) -> Option<Reaction> {
        self.states
            .get(&thread::current().id())
            .and_then(|state| state.stack.last().cloned())
    }

    pub(crate) fn is_active(&self) -> bool {
        self.states
            .get(&thread::current().id())
            .is_some_and(|state| !state.stack.is_empty())
    }

    pub(crate) fn contains(&self, reaction: &Reaction) -> bool {
        self.states
            .get(&thread::current().id())
            .is_some_and(|state| state.stack.contains(reaction))
    }

    pub(crate) fn depth(&self) -> usize {
        self.states
            .get(&thread::current().id())
            .map_or(0, |state| state.stack.len())
    }

    fn push(&self, reaction: Reaction) {
        self.states
            .entry(thread::current().id())
            .or_default()
            .stack
            .push(reaction);
    }

    fn pop(&self) -> Option<Reaction> {
        let id = thread::current().id();
        let popped = self.states.get_mut(&id).and_then(|mut state| state.stack.pop());
        self.states.remove_if(&id, |_, state| state.is_idle());
        popped
    }

    /// Raise the debugging flag. Returns `false` if it was already raised.
    fn begin_debug(&self) -> bool {
        let mut state = self.states.entry(thread::current().id()).or_default();
        !std::mem::replace(&mut state.debugging, true)
    }

    fn end_debug(&self) {
        let id = thread::current().id();
        if let Some(mut state) = self.states.get_mut(&id) {
            state.debugging = false;
        }
        self.states.remove_if(&id, |_, state| state.is_idle());
    }
}

/// Guard for one entry on the execution stack.
///
/// Pops its entry when dropped.
pub(crate) struct ExecutionContext<'a> {
    stacks: &'a ExecutionStacks,
    reaction_id: ReactionId,
}

impl<'a> ExecutionContext<'a> {
    /// Push `reaction` as the innermost running reaction of this thread.
    pub(crate) fn enter(stacks: &'a ExecutionStacks, reaction: Reaction) -> Self {
        let reaction_id = reaction.id();
        stacks.push(reaction);
        Self {
            stacks,
            reaction_id,
        }
    }
}

impl Drop for ExecutionContext<'_> {
    fn drop(&mut self) {
        let popped = self.stacks.pop();

        // Verify we're popping the right context.
        // This helps catch bugs where contexts are mismatched.
        if let Some(reaction) = &popped {
            debug_assert_eq!(
                reaction.id(),
                self.reaction_id,
                "ExecutionContext mismatch: expected {:?}, got {:?}",
                self.reaction_id,
                reaction.id()
            );
        }
    }
}

/// Guard for the debugging flag of this thread.
pub(crate) struct DebugScope<'a> {
    stacks: &'a ExecutionStacks,
}

impl<'a> DebugScope<'a> {
    /// Enter a debugger invocation, or `None` if one is already running.
    pub(crate) fn enter(stacks: &'a ExecutionStacks) -> Option<Self> {
        stacks.begin_debug().then_some(Self { stacks })
    }
}

impl Drop for DebugScope<'_> {
    fn drop(&mut self) {
        self.stacks.end_debug();
    }
}
