//! Base trap set for plain objects and arrays.

use tracing::trace;

use super::TrapSet;
use crate::graph::Operation;
use crate::reactive::Runtime;
use crate::value::{reflect, ObjectRef, PropertyKey, Value};

/// The default trap set.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseHandlers;

impl TrapSet for BaseHandlers {}

/// Read trap.
///
/// Records a `get` (except for well-known symbols). Nested objects are
/// returned as their existing view if they have one. Inside a reaction an
/// unwrapped nested object is wrapped on the spot, unless the property
/// holding it is locked (non-writable and non-configurable): such a slot
/// must report exactly what it holds, so the raw object is returned instead.
pub(crate) fn get(
    runtime: &Runtime,
    target: &ObjectRef,
    key: &PropertyKey,
    receiver: &Value,
) -> Value {
    let result = reflect::get(target, key, receiver);

    if key.is_well_known_symbol() {
        return result;
    }

    let tracking = runtime.is_tracking();
    if tracking {
        runtime.track(&Operation::get(target.clone(), key.clone(), receiver.clone()));
    }

    let Value::Object(object) = &result else {
        return result;
    };
    if let Some(view) = runtime.cached_view(object) {
        return Value::View(view);
    }
    if tracking {
        let locked = reflect::own_descriptor(target, key)
            .is_some_and(|descriptor| descriptor.is_locked());
        if !locked {
            return runtime.wrap(result);
        }
        trace!(object = %target.id(), %key, "locked property read unwrapped");
    }
    result
}

/// Containment trap. Always records a `has`.
pub(crate) fn has(runtime: &Runtime, target: &ObjectRef, key: &PropertyKey) -> bool {
    let result = reflect::has(target, key);
    runtime.track(&Operation::has(target.clone(), key.clone()));
    result
}

/// Enumeration trap. Always records a whole-object `iterate`.
pub(crate) fn own_keys(runtime: &Runtime, target: &ObjectRef) -> Vec<PropertyKey> {
    runtime.track(&Operation::iterate(target.clone()));
    reflect::own_keys(target)
}

/// Write trap.
///
/// Views are unwrapped before storing so raw objects never hold views.
/// A write that reached this trap through the prototype chain of another
/// object (the receiver is not this target's view) lands on the receiver
/// and is not announced here. Otherwise a new key announces `add`, a changed
/// value announces `set`, and an identical value announces nothing.
pub(crate) fn set(
    runtime: &Runtime,
    target: &ObjectRef,
    key: PropertyKey,
    value: Value,
    receiver: &Value,
) -> bool {
    let value = value.unwrapped();
    let had_key = target.has_own(&key);
    let old_value = reflect::get(target, &key, &Value::Object(target.clone()));

    if !reflect::set(target, key.clone(), value.clone(), receiver) {
        return false;
    }

    let own_receiver = matches!(receiver, Value::View(view) if view.raw().ptr_eq(target));
    if !own_receiver {
        return true;
    }

    if !had_key {
        runtime.trigger(&Operation::add(target.clone(), key, value, receiver.clone()));
    } else if value != old_value {
        runtime.trigger(&Operation::set(target.clone(), key, value, old_value, receiver.clone()));
    }
    true
}

/// Delete trap. Announces `delete` only when a present key was removed.
pub(crate) fn delete_property(runtime: &Runtime, target: &ObjectRef, key: &PropertyKey) -> bool {
    let had_key = target.has_own(key);
    let old_value = reflect::get(target, key, &Value::Object(target.clone()));

    let deleted = reflect::delete_property(target, key);
    if had_key && deleted {
        runtime.trigger(&Operation::delete(target.clone(), key.clone(), old_value));
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OperationKind;
    use crate::reactive::{ObserveOptions, Reaction};
    use crate::value::{PropertyFlags, WellKnownSymbol};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Observe with a debugger that records every operation kind it sees.
    fn recording(
        runtime: &Runtime,
        body: impl Fn() + Send + Sync + 'static,
    ) -> (Reaction, Arc<Mutex<Vec<OperationKind>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let reaction = runtime
            .observe(
                move |_: &[Value]| {
                    body();
                    Ok(Value::Undefined)
                },
                ObserveOptions::new().debugger(move |op| seen_clone.lock().push(op.kind)),
            )
            .unwrap();
        (reaction, seen)
    }

    #[test]
    fn reads_record_operations() {
        let runtime = Runtime::new();
        let view = runtime.observable(ObjectRef::from_entries([("a", 1)])).unwrap();
        let view_clone = view.clone();
        let (_reaction, seen) = recording(&runtime, move || {
            view_clone.get("a");
            view_clone.has("b");
            view_clone.keys();
        });
        assert_eq!(
            *seen.lock(),
            [OperationKind::Get, OperationKind::Has, OperationKind::Iterate]
        );
    }

    #[test]
    fn well_known_symbols_are_not_tracked() {
        let runtime = Runtime::new();
        let view = runtime.observable(ObjectRef::plain()).unwrap();
        let view_clone = view.clone();
        let (_reaction, seen) = recording(&runtime, move || {
            view_clone.get(WellKnownSymbol::Iterator);
        });
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn nested_objects_wrap_only_inside_reactions() {
        let runtime = Runtime::new();
        let child = ObjectRef::plain();
        let view = runtime
            .observable(ObjectRef::from_entries([("child", child.clone())]))
            .unwrap();

        assert_eq!(view.get("child"), Value::Object(child.clone()));

        let view_clone = view.clone();
        let inner = Arc::new(Mutex::new(Value::Undefined));
        let inner_clone = inner.clone();
        let _reaction = runtime
            .observe(
                move |_: &[Value]| {
                    *inner_clone.lock() = view_clone.get("child");
                    Ok(Value::Undefined)
                },
                ObserveOptions::new(),
            )
            .unwrap();
        assert!(inner.lock().is_view());

        // Once wrapped, the cached view is returned everywhere.
        assert!(view.get("child").is_view());
    }

    #[test]
    fn locked_nested_property_is_returned_raw() {
        let runtime = Runtime::new();
        let child = ObjectRef::plain();
        let raw = ObjectRef::plain();
        raw.define_property("child", child.clone(), PropertyFlags::FROZEN);
        let view = runtime.observable(raw).unwrap();

        let view_clone = view.clone();
        let inner = Arc::new(Mutex::new(Value::Undefined));
        let inner_clone = inner.clone();
        let _reaction = runtime
            .observe(
                move |_: &[Value]| {
                    *inner_clone.lock() = view_clone.get("child");
                    Ok(Value::Undefined)
                },
                ObserveOptions::new(),
            )
            .unwrap();
        assert_eq!(*inner.lock(), Value::Object(child));
    }

    #[test]
    fn writes_store_raw_values() {
        let runtime = Runtime::new();
        let parent = runtime.observable(ObjectRef::plain()).unwrap();
        let child = runtime.observable(ObjectRef::plain()).unwrap();

        assert!(parent.set("child", child.clone()));
        let stored = parent.raw().own_descriptor(&"child".into()).unwrap().value;
        assert_eq!(stored, Value::Object(child.raw().clone()));
    }

    #[test]
    fn refused_writes_and_deletes_report_false() {
        let runtime = Runtime::new();
        let raw = ObjectRef::from_entries([("a", 1)]);
        raw.freeze();
        let view = runtime.observable(raw).unwrap();
        assert!(!view.set("a", 2));
        assert!(!view.delete("a"));
        assert_eq!(view.get("a"), Value::from(1));
    }
}
