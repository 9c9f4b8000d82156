//! Wrapped Views
//!
//! An [`Observable`] is the reactive façade over exactly one raw object.
//! Where a proxy would make interception invisible, a view exposes it as
//! explicit accessor methods; everything else about it behaves like the raw
//! object: reads see the raw data, writes land in the raw data.
//!
//! Views are cheap handles. Wrapping the same raw object again in the same
//! runtime yields an equal view.

use std::fmt;
use std::sync::Arc;

use super::TrapSet;
use crate::reactive::Runtime;
use crate::value::{ObjectId, ObjectRef, PropertyKey, Value};

/// A view over a raw object whose accesses are tracked by a runtime.
#[derive(Clone)]
pub struct Observable {
    runtime: Runtime,
    raw: ObjectRef,
    handlers: Arc<dyn TrapSet>,
}

impl Observable {
    pub(crate) fn new(runtime: Runtime, raw: ObjectRef, handlers: Arc<dyn TrapSet>) -> Self {
        Self {
            runtime,
            raw,
            handlers,
        }
    }

    /// The raw object behind this view.
    pub fn raw(&self) -> &ObjectRef {
        &self.raw
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn id(&self) -> ObjectId {
        self.raw.id()
    }

    fn receiver(&self) -> Value {
        Value::View(self.clone())
    }

    /// Read a property.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Value {
        self.get_with_receiver(key.into(), &self.receiver())
    }

    /// Read a property on behalf of another object further down a
    /// prototype chain.
    pub fn get_with_receiver(&self, key: PropertyKey, receiver: &Value) -> Value {
        self.handlers.get(&self.runtime, &self.raw, &key, receiver)
    }

    /// Read a property and return it as a view, if it is one.
    pub fn get_view(&self, key: impl Into<PropertyKey>) -> Option<Observable> {
        match self.get(key) {
            Value::View(view) => Some(view),
            _ => None,
        }
    }

    /// Write a property. Returns `false` if the write was refused.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        self.set_with_receiver(key.into(), value.into(), &self.receiver())
    }

    /// Write a property on behalf of another object further down a
    /// prototype chain.
    pub fn set_with_receiver(&self, key: PropertyKey, value: Value, receiver: &Value) -> bool {
        self.handlers.set(&self.runtime, &self.raw, key, value, receiver)
    }

    /// Check for a property along the prototype chain.
    pub fn has(&self, key: impl Into<PropertyKey>) -> bool {
        self.handlers.has(&self.runtime, &self.raw, &key.into())
    }

    /// Delete an own property. Returns `false` if the delete was refused.
    pub fn delete(&self, key: impl Into<PropertyKey>) -> bool {
        self.handlers.delete_property(&self.runtime, &self.raw, &key.into())
    }

    /// Own keys, in enumeration order.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.handlers.own_keys(&self.runtime, &self.raw)
    }

    /// Own enumerable string-keyed entries, read through the view.
    pub fn entries(&self) -> Vec<(PropertyKey, Value)> {
        self.keys()
            .into_iter()
            .filter(|key| {
                key.as_str().is_some()
                    && self
                        .raw
                        .own_descriptor(key)
                        .is_some_and(|descriptor| descriptor.flags.enumerable)
            })
            .map(|key| {
                let value = self.get(key.clone());
                (key, value)
            })
            .collect()
    }

    /// Array length, read through the view. Zero for plain objects.
    pub fn len(&self) -> usize {
        self.get(PropertyKey::length())
            .as_f64()
            .map_or(0, |length| length as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to an array the way `Array.prototype.push` does: write the
    /// next index, then write `length`.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        let length = self.len();
        self.set(length, value) && self.set(PropertyKey::length(), length + 1)
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.runtime.ptr_eq(&other.runtime) && self.raw.ptr_eq(&other.raw)
    }
}

impl Eq for Observable {}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_reads_and_writes_raw_data() {
        let runtime = Runtime::new();
        let raw = ObjectRef::from_entries([("a", 1)]);
        let view = runtime.observable(raw.clone()).unwrap();

        assert_eq!(view.get("a"), Value::from(1));
        assert!(view.set("b", 2));
        assert_eq!(raw.get("b"), Value::from(2));
        assert!(view.has("b"));
        assert!(view.delete("b"));
        assert!(!raw.has_own(&"b".into()));
    }

    #[test]
    fn push_grows_arrays() {
        let runtime = Runtime::new();
        let view = runtime.observable(ObjectRef::from_values([1])).unwrap();
        assert!(view.push(2));
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(1usize), Value::from(2));
    }

    #[test]
    fn entries_skip_hidden_keys() {
        let runtime = Runtime::new();
        let view = runtime.observable(ObjectRef::from_values(["x"])).unwrap();
        let entries = view.entries();
        assert_eq!(entries, vec![(PropertyKey::from(0usize), Value::from("x"))]);
    }
}
