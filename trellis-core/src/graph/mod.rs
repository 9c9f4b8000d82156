//! Dependency Graph
//!
//! This module holds the bookkeeping that connects data to the reactions
//! that read it.
//!
//! # Overview
//!
//! The graph is bipartite and fully dynamic:
//!
//! - On one side are `(raw object, key)` pairs, plus one reserved iteration
//!   key per object standing for "which keys exist".
//! - On the other side are reactions.
//! - An edge means "this reaction read this key during its last run".
//!
//! Nothing is declared up front. Edges are observed while a reaction runs
//! and all of a reaction's edges are dropped right before it runs again, so
//! the edge set always reflects the most recent execution only. Branches
//! that are no longer taken stop producing notifications.
//!
//! # Design Decisions
//!
//! 1. Edges are stored in both directions. The forward index answers "who
//!    must re-run?" in O(dependents); the reverse index on each reaction
//!    releases all of its edges in O(edges).
//!
//! 2. `add` and `delete` reach the iteration dependents of their target,
//!    `set` does not. Reassigning an existing key cannot change the key set.

mod operation;
mod store;

pub use operation::{Operation, OperationKind};
pub use store::{DependencyKey, DependencyStore, Edge};
