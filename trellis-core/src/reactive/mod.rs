//! Reactions and the Runtime
//!
//! This module implements the execution side of the engine: the runtime
//! that owns all shared state, the reactions it tracks, and the schedulers
//! that decide when a triggered reaction runs.
//!
//! # Concepts
//!
//! ## Reactions
//!
//! A reaction wraps a user computation. Every run goes through the runtime,
//! which pushes the reaction on the execution stack, drops the edges of its
//! previous run, and records new edges for each view read along the way.
//!
//! ## Schedulers
//!
//! A triggered reaction is re-run immediately, passed to a callback, or
//! added to a deduplicating [`ReactionQueue`] that the host flushes when it
//! sees fit.
//!
//! ## Observer API
//!
//! [`Runtime::observe`] creates (or reuses) a reaction and runs it once
//! unless asked to be lazy. [`Runtime::unobserve`] retires it for good.
//!
//! # Implementation Notes
//!
//! Dependency attribution uses an explicit stack of running reactions kept
//! per thread. A reaction may call another reaction; the inner one's reads
//! are attributed to it, and the outer one picks up again once it returns.
//! A reaction that is already on the stack is not run again: direct or
//! indirect self-recursion is skipped rather than overflowing.

mod context;
mod observer;
mod reaction;
mod runtime;
mod scheduler;

pub use observer::{IntoReaction, ObserveOptions};
pub use reaction::{Debugger, Reaction, ReactionFn, ReactionId, WeakReaction};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{ReactionQueue, Scheduler};
