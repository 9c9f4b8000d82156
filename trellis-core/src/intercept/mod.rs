//! Interception Layer
//!
//! Views stand in for raw objects and route every access through a trap
//! set. The default trap set ([`BaseHandlers`]) turns reads into tracked
//! operations, writes and deletes into notifications, and exposes nested
//! objects as views when they are read from inside a reaction.
//!
//! Which objects get wrapped, and whether some kinds of objects need a
//! different trap set (keyed collections, say), is decided by an
//! [`InstrumentationPolicy`] supplied to the runtime. The core only consults
//! it.

mod handlers;
mod observable;
mod registry;

use std::sync::Arc;

pub use handlers::BaseHandlers;
pub use observable::Observable;
pub(crate) use registry::IdentityRegistry;

use crate::reactive::Runtime;
use crate::value::{ObjectRef, PropertyKey, Value};

/// The operations a view intercepts.
///
/// Every method defaults to the behavior of [`BaseHandlers`], so a
/// specialised trap set only overrides what it needs. Implementations report
/// reads with [`Runtime::track`] and changes with [`Runtime::trigger`].
pub trait TrapSet: Send + Sync {
    /// Read `key`, starting at `target`, on behalf of `receiver`.
    fn get(
        &self,
        runtime: &Runtime,
        target: &ObjectRef,
        key: &PropertyKey,
        receiver: &Value,
    ) -> Value {
        handlers::get(runtime, target, key, receiver)
    }

    /// Containment check along the prototype chain.
    fn has(&self, runtime: &Runtime, target: &ObjectRef, key: &PropertyKey) -> bool {
        handlers::has(runtime, target, key)
    }

    /// Own keys of `target`.
    fn own_keys(&self, runtime: &Runtime, target: &ObjectRef) -> Vec<PropertyKey> {
        handlers::own_keys(runtime, target)
    }

    /// Write `key`, starting at `target`, on behalf of `receiver`.
    fn set(
        &self,
        runtime: &Runtime,
        target: &ObjectRef,
        key: PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> bool {
        handlers::set(runtime, target, key, value, receiver)
    }

    /// Delete an own property of `target`.
    fn delete_property(&self, runtime: &Runtime, target: &ObjectRef, key: &PropertyKey) -> bool {
        handlers::delete_property(runtime, target, key)
    }
}

/// Decides which raw objects become views and how they are intercepted.
pub trait InstrumentationPolicy: Send + Sync {
    /// Whether `object` may be wrapped at all.
    fn should_instrument(&self, object: &ObjectRef) -> bool;

    /// A specialised trap set for `object`, or `None` for [`BaseHandlers`].
    fn handlers(&self, object: &ObjectRef) -> Option<Arc<dyn TrapSet>> {
        let _ = object;
        None
    }
}

/// Policy that wraps every object with the base trap set.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl InstrumentationPolicy for DefaultPolicy {
    fn should_instrument(&self, _object: &ObjectRef) -> bool {
        true
    }
}

impl<F> InstrumentationPolicy for F
where
    F: Fn(&ObjectRef) -> bool + Send + Sync,
{
    fn should_instrument(&self, object: &ObjectRef) -> bool {
        self(object)
    }
}
