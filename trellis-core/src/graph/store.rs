//! Dependency Store
//!
//! The store connects `(raw object, key)` pairs to the reactions that read
//! them. It is bidirectional:
//!
//! - Forward: object id -> key -> reactions, used to find who to notify.
//! - Reverse: each reaction keeps the list of edges it holds, used to drop
//!   all of them in one pass before the reaction runs again.
//!
//! Both directions are non-owning. Objects are held weakly so a dropped
//! object's entry can be purged, and reactions are held weakly so that
//! dropping the last handle to a reaction lets it go.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::operation::{Operation, OperationKind};
use crate::reactive::{Reaction, ReactionId, WeakReaction};
use crate::value::{ObjectId, ObjectRef, PropertyKey, WeakObjectRef};

/// The key half of a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyKey {
    Property(PropertyKey),
    /// Reserved pseudo-key for "the set of keys" of a plain object.
    Iteration,
}

impl DependencyKey {
    /// The key standing for membership/order of `target`'s keys.
    ///
    /// Arrays already expose that as `length`, so their iteration
    /// dependents are registered there.
    pub fn iteration_of(target: &ObjectRef) -> Self {
        if target.is_array() {
            Self::Property(PropertyKey::length())
        } else {
            Self::Iteration
        }
    }
}

/// One `(object, key)` edge held by a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub target: ObjectId,
    pub key: DependencyKey,
}

type ReactionSet = IndexMap<ReactionId, WeakReaction>;

struct TargetEntry {
    target: WeakObjectRef,
    keys: IndexMap<DependencyKey, ReactionSet>,
}

/// Forward index of dependency edges.
#[derive(Default)]
pub struct DependencyStore {
    targets: HashMap<ObjectId, TargetEntry>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys an operation depends on when recorded.
    fn recorded_keys(operation: &Operation) -> Vec<DependencyKey> {
        let mut keys = Vec::with_capacity(2);
        let keyed = matches!(
            operation.kind,
            OperationKind::Get | OperationKind::Has | OperationKind::Set | OperationKind::Delete
        );
        if keyed {
            if let Some(key) = &operation.key {
                keys.push(DependencyKey::Property(key.clone()));
            }
        }
        if matches!(
            operation.kind,
            OperationKind::Iterate | OperationKind::Add | OperationKind::Delete
        ) {
            let iteration = DependencyKey::iteration_of(&operation.target);
            if !keys.contains(&iteration) {
                keys.push(iteration);
            }
        }
        keys
    }

    /// Record that `reaction` depends on what `operation` touched.
    ///
    /// Each new edge is mirrored onto the reaction's reverse index; edges the
    /// reaction already holds are left alone.
    pub fn record(&mut self, reaction: &Reaction, operation: &Operation) {
        let keys = Self::recorded_keys(operation);
        if keys.is_empty() {
            return;
        }
        let target_id = operation.target.id();
        let entry = self.targets.entry(target_id).or_insert_with(|| TargetEntry {
            target: operation.target.downgrade(),
            keys: IndexMap::new(),
        });
        for key in keys {
            let reactions = entry.keys.entry(key.clone()).or_default();
            if reactions.contains_key(&reaction.id()) {
                continue;
            }
            reactions.insert(reaction.id(), reaction.downgrade());
            reaction.push_edge(Edge {
                target: target_id,
                key,
            });
        }
    }

    /// Reactions to notify for a mutation, deduplicated, in registration order.
    ///
    /// `set` reaches only the key's dependents. `add` and `delete` also reach
    /// the target's iteration dependents, and `clear` reaches everyone
    /// registered on the target.
    pub fn reactions_for(&self, operation: &Operation) -> Vec<Reaction> {
        let Some(entry) = self.targets.get(&operation.target.id()) else {
            return Vec::new();
        };

        let mut found: ReactionSet = IndexMap::new();
        let mut collect = |set: Option<&ReactionSet>| {
            for (id, weak) in set.into_iter().flatten() {
                found.entry(*id).or_insert_with(|| weak.clone());
            }
        };

        if operation.kind == OperationKind::Clear {
            for set in entry.keys.values() {
                collect(Some(set));
            }
        } else {
            if let Some(key) = &operation.key {
                collect(entry.keys.get(&DependencyKey::Property(key.clone())));
            }
            if operation.kind.is_structural() {
                collect(entry.keys.get(&DependencyKey::iteration_of(&operation.target)));
            }
        }

        found.values().filter_map(WeakReaction::upgrade).collect()
    }

    /// Remove the given edges of a reaction from the forward index.
    pub fn release<I>(&mut self, reaction: ReactionId, edges: I)
    where
        I: IntoIterator<Item = Edge>,
    {
        for edge in edges {
            let Some(entry) = self.targets.get_mut(&edge.target) else {
                continue;
            };
            if let Some(reactions) = entry.keys.get_mut(&edge.key) {
                reactions.shift_remove(&reaction);
                if reactions.is_empty() {
                    entry.keys.shift_remove(&edge.key);
                }
            }
            if entry.keys.is_empty() {
                self.targets.remove(&edge.target);
            }
        }
    }

    /// Drop entries for objects that no longer exist and reactions that
    /// have been dropped. Returns the number of object entries removed.
    pub fn purge(&mut self) -> usize {
        let before = self.targets.len();
        self.targets.retain(|_, entry| {
            if !entry.target.is_alive() {
                return false;
            }
            entry.keys.retain(|_, reactions| {
                reactions.retain(|_, weak| weak.is_alive());
                !reactions.is_empty()
            });
            !entry.keys.is_empty()
        });
        before - self.targets.len()
    }

    /// Number of live reactions registered on `(target, key)`.
    pub fn dependents(&self, target: &ObjectRef, key: &DependencyKey) -> usize {
        self.targets
            .get(&target.id())
            .and_then(|entry| entry.keys.get(key))
            .map_or(0, |reactions| reactions.values().filter(|weak| weak.is_alive()).count())
    }

    /// Number of objects with at least one edge.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}
