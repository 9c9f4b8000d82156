//! Ordinary object algorithms.
//!
//! These are the untracked `Reflect`-style operations the traps delegate to.
//! They walk the prototype chain; when a link in the chain is a wrapped view
//! the walk continues through that view's traps, exactly as a property access
//! would pass through a proxy sitting in a prototype chain. That is how a
//! write that starts on one object can reach the write trap of another with
//! a foreign receiver.

use super::{ObjectRef, PropertyDescriptor, PropertyKey, Value};

/// Read `key`, starting at `target`, with `receiver` as the original holder.
pub fn get(target: &ObjectRef, key: &PropertyKey, receiver: &Value) -> Value {
    if let Some(descriptor) = target.own_descriptor(key) {
        return descriptor.value;
    }
    match target.prototype() {
        Some(Value::Object(proto)) => get(&proto, key, receiver),
        Some(Value::View(view)) => view.get_with_receiver(key.clone(), receiver),
        _ => Value::Undefined,
    }
}

/// Whether `key` is present on `target` or anywhere on its prototype chain.
pub fn has(target: &ObjectRef, key: &PropertyKey) -> bool {
    if target.has_own(key) {
        return true;
    }
    match target.prototype() {
        Some(Value::Object(proto)) => has(&proto, key),
        Some(Value::View(view)) => view.has(key.clone()),
        _ => false,
    }
}

/// Write `key`, starting at `target`, on behalf of `receiver`.
///
/// An inherited writable property is shadowed by a new own property on the
/// receiver, never modified in place. Returns `false` when the write is
/// refused (read-only property, non-extensible receiver, primitive receiver).
pub fn set(target: &ObjectRef, key: PropertyKey, value: Value, receiver: &Value) -> bool {
    match target.own_descriptor(&key) {
        Some(descriptor) if !descriptor.flags.writable => false,
        Some(_) => put_on_receiver(key, value, receiver),
        None => match target.prototype() {
            Some(Value::Object(proto)) => set(&proto, key, value, receiver),
            Some(Value::View(view)) => view.set_with_receiver(key, value, receiver),
            _ => put_on_receiver(key, value, receiver),
        },
    }
}

fn put_on_receiver(key: PropertyKey, value: Value, receiver: &Value) -> bool {
    // Defining a property on a view lands on its raw object untracked;
    // the view's own write trap (if any) is already handling notification.
    match receiver.raw_object() {
        Some(object) => object.put_value(key, value),
        None => false,
    }
}

/// Delete an own property of `target`.
pub fn delete_property(target: &ObjectRef, key: &PropertyKey) -> bool {
    target.remove_own(key)
}

/// Own keys of `target` in enumeration order.
pub fn own_keys(target: &ObjectRef) -> Vec<PropertyKey> {
    target.own_keys()
}

/// Own property descriptor of `target`.
pub fn own_descriptor(target: &ObjectRef, key: &PropertyKey) -> Option<PropertyDescriptor> {
    target.own_descriptor(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_prototype_chain() {
        let parent = ObjectRef::from_entries([("greeting", "hello")]);
        let child = ObjectRef::plain();
        child.set_prototype(Some(parent.into())).unwrap();
        assert_eq!(child.get("greeting"), Value::from("hello"));
        assert!(has(&child, &"greeting".into()));
        assert!(!child.has_own(&"greeting".into()));
    }

    #[test]
    fn set_shadows_inherited_property() {
        let parent = ObjectRef::from_entries([("name", "parent")]);
        let child = ObjectRef::plain();
        child.set_prototype(Some(parent.clone().into())).unwrap();

        assert!(child.set("name", "child"));
        assert_eq!(child.get("name"), Value::from("child"));
        assert_eq!(parent.get("name"), Value::from("parent"));
    }

    #[test]
    fn inherited_read_only_property_blocks_write() {
        let parent = ObjectRef::from_entries([("fixed", 1)]);
        parent.freeze();
        let child = ObjectRef::plain();
        child.set_prototype(Some(parent.into())).unwrap();

        assert!(!child.set("fixed", 2));
        assert!(!child.has_own(&"fixed".into()));
    }

    #[test]
    fn primitive_receiver_refuses_write() {
        let target = ObjectRef::plain();
        assert!(!set(&target, "a".into(), Value::from(1), &Value::from(3)));
        assert!(!target.has_own(&"a".into()));
    }
}
