//! Operations
//!
//! An operation describes a single interception event. Operations are
//! ephemeral: they are built by a trap, handed synchronously to the
//! dependency store or the reaction runner, and dropped.

use std::fmt;

use crate::value::{ObjectRef, PropertyKey, Value};

/// What kind of access an operation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A property read.
    Get,
    /// A containment check.
    Has,
    /// An enumeration of the whole object's keys.
    Iterate,
    /// A write that created a new key.
    Add,
    /// A write that changed the value of an existing key.
    Set,
    /// A removal of an existing key.
    Delete,
    /// A removal of every entry at once (emitted by collection trap sets).
    Clear,
}

impl OperationKind {
    /// Reads are recorded as dependencies; everything else triggers.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Get | Self::Has | Self::Iterate)
    }

    /// Whether the operation changes which keys the target has.
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Iterate | Self::Add | Self::Delete | Self::Clear)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Has => "has",
            Self::Iterate => "iterate",
            Self::Add => "add",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// A single interception event.
#[derive(Debug, Clone)]
pub struct Operation {
    /// The raw object the operation happened on.
    pub target: ObjectRef,
    /// The property involved; `None` for whole-object operations.
    pub key: Option<PropertyKey>,
    pub kind: OperationKind,
    /// The value written (writes only).
    pub value: Option<Value>,
    /// The value replaced or removed (`set` and `delete` only).
    pub old_value: Option<Value>,
    /// The object the access started on.
    pub receiver: Option<Value>,
}

impl Operation {
    fn new(target: ObjectRef, key: Option<PropertyKey>, kind: OperationKind) -> Self {
        Self {
            target,
            key,
            kind,
            value: None,
            old_value: None,
            receiver: None,
        }
    }

    pub fn get(target: ObjectRef, key: PropertyKey, receiver: Value) -> Self {
        Self {
            receiver: Some(receiver),
            ..Self::new(target, Some(key), OperationKind::Get)
        }
    }

    pub fn has(target: ObjectRef, key: PropertyKey) -> Self {
        Self::new(target, Some(key), OperationKind::Has)
    }

    pub fn iterate(target: ObjectRef) -> Self {
        Self::new(target, None, OperationKind::Iterate)
    }

    pub fn add(target: ObjectRef, key: PropertyKey, value: Value, receiver: Value) -> Self {
        Self {
            value: Some(value),
            receiver: Some(receiver),
            ..Self::new(target, Some(key), OperationKind::Add)
        }
    }

    pub fn set(
        target: ObjectRef,
        key: PropertyKey,
        value: Value,
        old_value: Value,
        receiver: Value,
    ) -> Self {
        Self {
            value: Some(value),
            old_value: Some(old_value),
            receiver: Some(receiver),
            ..Self::new(target, Some(key), OperationKind::Set)
        }
    }

    pub fn delete(target: ObjectRef, key: PropertyKey, old_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::new(target, Some(key), OperationKind::Delete)
        }
    }

    pub fn clear(target: ObjectRef) -> Self {
        Self::new(target, None, OperationKind::Clear)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} {}.{}", self.kind, self.target.id(), key),
            None => write!(f, "{} {}", self.kind, self.target.id()),
        }
    }
}
