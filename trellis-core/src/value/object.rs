//! Raw Objects
//!
//! A raw object is the authoritative, mutable data behind a wrapped view.
//! The engine never mutates one on its own initiative: every change here is
//! the pass-through of a user write.
//!
//! # Layout
//!
//! Each object has:
//! - A process-unique id (used as the key of every weak side table)
//! - A kind (plain object or array)
//! - An insertion-ordered property table
//! - For arrays, sparse element slots keyed by index (a missing index is a
//!   hole) and an explicit `length`, exposed as an implicit property
//! - An extensibility flag and an optional prototype link

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::key::PropertyKey;
use super::{reflect, Value};
use crate::error::{Error, Result};

/// Process-unique identifier of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of raw object this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    /// Integer-keyed elements plus an implicit `length` property.
    Array,
}

/// Attribute flags of a data property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyFlags {
    /// Flags of a property created by plain assignment.
    pub const DEFAULT: Self = Self {
        writable: true,
        enumerable: true,
        configurable: true,
    };

    /// Flags of a property on a frozen object.
    pub const FROZEN: Self = Self {
        writable: false,
        enumerable: true,
        configurable: false,
    };
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A snapshot of one own data property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Value,
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    /// Whether wrapping this property's value on read would misrepresent it:
    /// a non-writable, non-configurable slot must always report the value
    /// it actually holds.
    pub fn is_locked(&self) -> bool {
        !self.flags.writable && !self.flags.configurable
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    flags: PropertyFlags,
}

impl Slot {
    fn descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor {
            value: self.value.clone(),
            flags: self.flags,
        }
    }
}

#[derive(Debug)]
struct RawObject {
    properties: IndexMap<PropertyKey, Slot>,
    elements: BTreeMap<u32, Slot>,
    length: u32,
    length_writable: bool,
    extensible: bool,
    prototype: Option<Value>,
}

struct ObjectCell {
    id: ObjectId,
    kind: ObjectKind,
    state: RwLock<RawObject>,
}

/// Shared handle to a raw object.
///
/// Cloning the handle shares the object; equality is identity.
///
/// Property values hold child objects strongly. A raw graph that contains
/// a cycle (an object storing itself, a child pointing back at its parent)
/// keeps itself alive, so it is never dropped and its registry and store
/// entries survive [`Runtime::purge`]. Break such cycles by deleting the
/// back-reference before letting go of the graph.
///
/// [`Runtime::purge`]: crate::reactive::Runtime::purge
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

/// Non-owning handle to a raw object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<ObjectCell>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

fn valid_length(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
            Some(*n as u32)
        }
        _ => None,
    }
}

fn element_index(key: &PropertyKey) -> Option<u32> {
    key.array_index().and_then(|index| u32::try_from(index).ok())
}

impl ObjectRef {
    fn with_kind(kind: ObjectKind) -> Self {
        Self(Arc::new(ObjectCell {
            id: ObjectId::next(),
            kind,
            state: RwLock::new(RawObject {
                properties: IndexMap::new(),
                elements: BTreeMap::new(),
                length: 0,
                length_writable: true,
                extensible: true,
                prototype: None,
            }),
        }))
    }

    /// Create an empty plain object.
    pub fn plain() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Self::with_kind(ObjectKind::Array)
    }

    /// Create a plain object from key/value pairs, in order.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
    {
        let object = Self::plain();
        {
            let mut state = object.0.state.write();
            for (key, value) in entries {
                state.properties.insert(
                    key.into(),
                    Slot {
                        value: Value::from_into(value),
                        flags: PropertyFlags::DEFAULT,
                    },
                );
            }
        }
        object
    }

    /// Create an array from its elements.
    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        let object = Self::array();
        {
            let mut state = object.0.state.write();
            for (index, value) in (0..u32::MAX).zip(values) {
                state.elements.insert(
                    index,
                    Slot {
                        value: Value::from_into(value),
                        flags: PropertyFlags::DEFAULT,
                    },
                );
                state.length = index + 1;
            }
        }
        object
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    pub fn is_array(&self) -> bool {
        self.0.kind == ObjectKind::Array
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Array length; zero for plain objects.
    pub fn len(&self) -> usize {
        self.0.state.read().length as usize
    }

    /// No elements and no named properties.
    pub fn is_empty(&self) -> bool {
        let state = self.0.state.read();
        state.length == 0 && state.properties.is_empty()
    }

    // ------------------------------------------------------------------
    // Own-property primitives (no prototype walk, no tracking)
    // ------------------------------------------------------------------

    /// Describe an own property, if present.
    pub fn own_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let state = self.0.state.read();
        if self.is_array() {
            if let Some(index) = element_index(key) {
                return state.elements.get(&index).map(Slot::descriptor);
            }
            if key.as_str() == Some("length") {
                return Some(PropertyDescriptor {
                    value: Value::Number(f64::from(state.length)),
                    flags: PropertyFlags {
                        writable: state.length_writable,
                        enumerable: false,
                        configurable: false,
                    },
                });
            }
        }
        state.properties.get(key).map(Slot::descriptor)
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.own_descriptor(key).is_some()
    }

    /// Own keys in enumeration order: array indices ascending, then
    /// `length` for arrays, then string keys in insertion order, then
    /// symbols in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let state = self.0.state.read();
        let mut keys = Vec::with_capacity(state.elements.len() + state.properties.len() + 1);
        if self.is_array() {
            keys.extend(
                state
                    .elements
                    .keys()
                    .map(|&index| PropertyKey::from(index as usize)),
            );
            keys.push(PropertyKey::length());
        }
        keys.extend(
            state
                .properties
                .keys()
                .filter(|key| matches!(key, PropertyKey::String(_)))
                .cloned(),
        );
        keys.extend(
            state
                .properties
                .keys()
                .filter(|key| matches!(key, PropertyKey::Symbol(_)))
                .cloned(),
        );
        keys
    }

    /// Assign to an own property as the receiver of an ordinary `set`.
    ///
    /// Updates an existing writable property in place or creates a new
    /// default-flagged one. Returns `false` when the write is refused.
    pub(crate) fn put_value(&self, key: PropertyKey, value: Value) -> bool {
        let mut state = self.0.state.write();
        if self.is_array() {
            if let Some(index) = element_index(&key) {
                return Self::put_element(&mut state, index, value);
            }
            if key.as_str() == Some("length") {
                return Self::set_length(&mut state, &value);
            }
        }
        if let Some(slot) = state.properties.get_mut(&key) {
            if !slot.flags.writable {
                return false;
            }
            slot.value = value;
            return true;
        }
        if !state.extensible {
            return false;
        }
        state.properties.insert(
            key,
            Slot {
                value,
                flags: PropertyFlags::DEFAULT,
            },
        );
        true
    }

    fn put_element(state: &mut RawObject, index: u32, value: Value) -> bool {
        if let Some(slot) = state.elements.get_mut(&index) {
            if !slot.flags.writable {
                return false;
            }
            slot.value = value;
            return true;
        }
        if !state.extensible {
            return false;
        }
        if index >= state.length {
            if !state.length_writable {
                return false;
            }
            state.length = index + 1;
        }
        state.elements.insert(
            index,
            Slot {
                value,
                flags: PropertyFlags::DEFAULT,
            },
        );
        true
    }

    fn set_length(state: &mut RawObject, value: &Value) -> bool {
        let Some(new_len) = valid_length(value) else {
            tracing::warn!(?value, "rejected invalid array length");
            return false;
        };
        if new_len == state.length {
            return true;
        }
        if !state.length_writable {
            return false;
        }
        if new_len > state.length {
            state.length = new_len;
            return true;
        }
        // Truncation stops above the highest non-configurable element.
        let floor = state
            .elements
            .range(new_len..)
            .rev()
            .find(|(_, slot)| !slot.flags.configurable)
            .map_or(new_len, |(&index, _)| index + 1);
        let _removed = state.elements.split_off(&floor);
        state.length = floor;
        floor == new_len
    }

    /// Define (or redefine) an own data property with explicit flags.
    ///
    /// Non-configurable properties may only have their value changed while
    /// still writable, or be downgraded to non-writable.
    pub fn define_property(
        &self,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
        flags: PropertyFlags,
    ) -> bool {
        let key = key.into();
        let value = Value::from_into(value);
        let mut state = self.0.state.write();

        if self.is_array() {
            if key.as_str() == Some("length") {
                if !Self::set_length(&mut state, &value) {
                    return false;
                }
                if !flags.writable {
                    state.length_writable = false;
                }
                return true;
            }
            if let Some(index) = element_index(&key) {
                let existing = state.elements.get(&index).cloned();
                if !Self::redefinable(existing.as_ref(), &value, flags, state.extensible) {
                    return false;
                }
                if index >= state.length {
                    if !state.length_writable {
                        return false;
                    }
                    state.length = index + 1;
                }
                state.elements.insert(index, Slot { value, flags });
                return true;
            }
        }

        let existing = state.properties.get(&key).cloned();
        if !Self::redefinable(existing.as_ref(), &value, flags, state.extensible) {
            return false;
        }
        state.properties.insert(key, Slot { value, flags });
        true
    }

    fn redefinable(
        existing: Option<&Slot>,
        value: &Value,
        flags: PropertyFlags,
        extensible: bool,
    ) -> bool {
        match existing {
            None => extensible,
            Some(slot) if slot.flags.configurable => true,
            Some(slot) => {
                if flags.configurable || flags.enumerable != slot.flags.enumerable {
                    return false;
                }
                if slot.flags.writable {
                    return true;
                }
                !flags.writable && slot.value == *value
            }
        }
    }

    /// Delete an own property. Absent keys succeed trivially;
    /// non-configurable ones are refused.
    pub(crate) fn remove_own(&self, key: &PropertyKey) -> bool {
        let mut state = self.0.state.write();
        if self.is_array() {
            if let Some(index) = element_index(key) {
                if state.elements.get(&index).is_some_and(|slot| !slot.flags.configurable) {
                    return false;
                }
                state.elements.remove(&index);
                return true;
            }
            if key.as_str() == Some("length") {
                return false;
            }
        }
        match state.properties.get(key) {
            None => true,
            Some(slot) if !slot.flags.configurable => false,
            Some(_) => {
                state.properties.shift_remove(key);
                true
            }
        }
    }

    // ------------------------------------------------------------------
    // Integrity levels and prototype
    // ------------------------------------------------------------------

    pub fn is_extensible(&self) -> bool {
        self.0.state.read().extensible
    }

    pub fn prevent_extensions(&self) {
        self.0.state.write().extensible = false;
    }

    /// Make every own property non-configurable and forbid new ones.
    pub fn seal(&self) {
        let mut state = self.0.state.write();
        state.extensible = false;
        for slot in state.properties.values_mut() {
            slot.flags.configurable = false;
        }
        for slot in state.elements.values_mut() {
            slot.flags.configurable = false;
        }
    }

    /// Seal the object and make every own property read-only.
    pub fn freeze(&self) {
        let mut state = self.0.state.write();
        state.extensible = false;
        state.length_writable = false;
        for slot in state.properties.values_mut() {
            slot.flags.configurable = false;
            slot.flags.writable = false;
        }
        for slot in state.elements.values_mut() {
            slot.flags.configurable = false;
            slot.flags.writable = false;
        }
    }

    pub fn is_frozen(&self) -> bool {
        let state = self.0.state.read();
        !state.extensible
            && (!self.is_array() || !state.length_writable)
            && state
                .properties
                .values()
                .chain(state.elements.values())
                .all(|slot| !slot.flags.writable && !slot.flags.configurable)
    }

    pub fn prototype(&self) -> Option<Value> {
        self.0.state.read().prototype.clone()
    }

    /// Replace the prototype link.
    ///
    /// Returns `Ok(false)` when the link would close a cycle or the object
    /// is not extensible.
    pub fn set_prototype(&self, prototype: Option<Value>) -> Result<bool> {
        if let Some(proto) = &prototype {
            let Some(mut cursor) = proto.raw_object() else {
                return Err(Error::NotAnObject(proto.type_name()));
            };
            loop {
                if cursor.ptr_eq(self) {
                    return Ok(false);
                }
                match cursor.prototype().and_then(|next| next.raw_object()) {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }
        let mut state = self.0.state.write();
        if !state.extensible {
            return Ok(false);
        }
        state.prototype = prototype;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Untracked ordinary access
    // ------------------------------------------------------------------

    /// Ordinary property read with this object as the receiver.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Value {
        reflect::get(self, &key.into(), &Value::Object(self.clone()))
    }

    /// Ordinary property write with this object as the receiver.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        reflect::set(self, key.into(), Value::from_into(value), &Value::Object(self.clone()))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_keeps_insertion_order() {
        let object = ObjectRef::from_entries([("b", 1), ("a", 2)]);
        object.set("c", 3);
        let keys: Vec<_> = object.own_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn array_length_follows_elements() {
        let array = ObjectRef::from_values([1, 2]);
        assert_eq!(array.get("length"), Value::from(2));

        assert!(array.set(4usize, 5));
        assert_eq!(array.len(), 5);
        assert!(!array.has_own(&PropertyKey::from(3usize)));

        assert!(array.set("length", 1));
        assert_eq!(array.len(), 1);
        assert_eq!(array.get(0usize), Value::from(1));
    }

    #[test]
    fn far_index_write_stays_sparse() {
        let array = ObjectRef::from_values([1]);
        assert!(array.set(3_000_000_000usize, 2));
        assert_eq!(array.len(), 3_000_000_001);
        let keys: Vec<_> = array.own_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["0", "3000000000", "length"]);
        assert!(array.get(2usize).is_undefined());
    }

    #[test]
    fn huge_length_grows_and_truncates_cheaply() {
        let array = ObjectRef::from_values([1, 2]);
        assert!(array.set("length", 4e9));
        assert_eq!(array.len(), 4_000_000_000);
        assert_eq!(array.own_keys().len(), 3);

        assert!(array.set("length", 1));
        assert_eq!(array.len(), 1);
        assert!(!array.has_own(&PropertyKey::from(1usize)));
    }

    #[test]
    fn truncation_stops_at_non_configurable_element() {
        let array = ObjectRef::from_values([1, 2, 3]);
        let pinned = PropertyFlags {
            writable: true,
            enumerable: true,
            configurable: false,
        };
        assert!(array.define_property(1usize, 2, pinned));
        assert!(!array.set("length", 0));
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(1usize), Value::from(2));
        assert!(!array.has_own(&PropertyKey::from(2usize)));
    }

    #[test]
    fn invalid_length_is_refused() {
        let array = ObjectRef::from_values([1]);
        assert!(!array.set("length", -1));
        assert!(!array.set("length", 1.5));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn array_keys_put_indices_first() {
        let array = ObjectRef::from_values(["x", "y"]);
        array.set("label", "pair");
        let keys: Vec<_> = array.own_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["0", "1", "length", "label"]);
    }

    #[test]
    fn frozen_object_refuses_changes() {
        let object = ObjectRef::from_entries([("a", 1)]);
        object.freeze();
        assert!(object.is_frozen());
        assert!(!object.set("a", 2));
        assert!(!object.set("b", 2));
        assert!(!object.remove_own(&PropertyKey::from("a")));
        assert_eq!(object.get("a"), Value::from(1));
        assert!(object.own_descriptor(&"a".into()).unwrap().is_locked());
    }

    #[test]
    fn sealed_object_allows_value_changes() {
        let object = ObjectRef::from_entries([("a", 1)]);
        object.seal();
        assert!(object.set("a", 2));
        assert!(!object.set("b", 2));
        assert!(!object.remove_own(&PropertyKey::from("a")));
    }

    #[test]
    fn non_configurable_property_can_only_be_locked_down() {
        let object = ObjectRef::plain();
        let flags = PropertyFlags {
            writable: true,
            enumerable: true,
            configurable: false,
        };
        assert!(object.define_property("a", 1, flags));
        assert!(object.define_property("a", 2, PropertyFlags::FROZEN));
        assert!(!object.define_property("a", 3, PropertyFlags::FROZEN));
        assert!(!object.define_property("a", 2, PropertyFlags::DEFAULT));
    }

    #[test]
    fn prototype_cycles_are_refused() {
        let parent = ObjectRef::plain();
        let child = ObjectRef::plain();
        assert!(child.set_prototype(Some(parent.clone().into())).unwrap());
        assert!(!parent.set_prototype(Some(child.clone().into())).unwrap());
        assert!(matches!(
            child.set_prototype(Some(Value::from(1))),
            Err(Error::NotAnObject("number"))
        ));
    }

    #[test]
    fn deleting_array_element_leaves_hole() {
        let array = ObjectRef::from_values([1, 2, 3]);
        assert!(array.remove_own(&PropertyKey::from(1usize)));
        assert_eq!(array.len(), 3);
        assert!(array.get(1usize).is_undefined());
        assert!(!array.remove_own(&PropertyKey::length()));
    }
}
