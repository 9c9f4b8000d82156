//! Identity Registry
//!
//! Records which raw objects have a view and with which trap set. The view
//! itself is a cheap handle rebuilt on lookup, so the registry only needs to
//! hold the raw object weakly: once the raw object is gone its entry is dead
//! and [`IdentityRegistry::purge`] drops it.

use std::collections::HashMap;
use std::sync::Arc;

use super::TrapSet;
use crate::value::{ObjectId, ObjectRef, WeakObjectRef};

struct Registration {
    raw: WeakObjectRef,
    handlers: Arc<dyn TrapSet>,
}

#[derive(Default)]
pub(crate) struct IdentityRegistry {
    views: HashMap<ObjectId, Registration>,
    since_purge: usize,
}

impl IdentityRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Trap set of `object`'s view, if it has one.
    pub(crate) fn lookup(&self, object: &ObjectRef) -> Option<Arc<dyn TrapSet>> {
        self.views
            .get(&object.id())
            .filter(|registration| registration.raw.is_alive())
            .map(|registration| registration.handlers.clone())
    }

    /// Register a view for `object`. If one already exists, its trap set
    /// wins and is returned.
    pub(crate) fn register(
        &mut self,
        object: &ObjectRef,
        handlers: Arc<dyn TrapSet>,
    ) -> Arc<dyn TrapSet> {
        let registration = self.views.entry(object.id()).or_insert_with(|| {
            self.since_purge += 1;
            Registration {
                raw: object.downgrade(),
                handlers,
            }
        });
        registration.handlers.clone()
    }

    pub(crate) fn registrations_since_purge(&self) -> usize {
        self.since_purge
    }

    /// Drop entries whose raw object is gone.
    pub(crate) fn purge(&mut self) -> usize {
        let before = self.views.len();
        self.views.retain(|_, registration| registration.raw.is_alive());
        self.since_purge = 0;
        before - self.views.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.views.len()
    }
}
