//! Dynamic Values
//!
//! Rust has no native property interception, so the data a reactive program
//! works on is expressed in an explicit dynamic value model: primitives, raw
//! objects, and wrapped views over raw objects.
//!
//! Raw objects ([`ObjectRef`]) are the authoritative data. Views
//! ([`Observable`]) are the reactive façade that records reads and announces
//! writes. A raw object never stores a view: every write path unwraps views
//! back to the raw object behind them.
//!
//! # Equality
//!
//! `PartialEq` on [`Value`] is strict equality: numbers compare with IEEE
//! `==` (so `NaN != NaN` and `0.0 == -0.0`), strings by content, objects and
//! views by identity. The interception layer uses it to decide whether a
//! write changed anything.

mod json;
mod key;
mod object;
pub mod reflect;

use std::fmt;
use std::sync::Arc;

pub use json::MAX_SNAPSHOT_ARRAY_LEN;
pub use key::{PropertyKey, Symbol, WellKnownSymbol};
pub use object::{
    ObjectId, ObjectKind, ObjectRef, PropertyDescriptor, PropertyFlags, WeakObjectRef,
};

use crate::intercept::Observable;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    /// A raw object.
    Object(ObjectRef),
    /// A wrapped view over a raw object.
    View(Observable),
}

impl Value {
    /// Convert anything value-like, unwrapping views to their raw object.
    pub(crate) fn from_into(value: impl Into<Value>) -> Value {
        let value: Value = value.into();
        value.unwrapped()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether this is a reference type (raw object or view).
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::View(_))
    }

    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&Observable> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    /// The raw object behind this value, looking through views.
    pub fn raw_object(&self) -> Option<ObjectRef> {
        match self {
            Self::Object(object) => Some(object.clone()),
            Self::View(view) => Some(view.raw().clone()),
            _ => None,
        }
    }

    /// This value with any view replaced by its raw object.
    pub fn unwrapped(self) -> Value {
        match self {
            Self::View(view) => Self::Object(view.raw().clone()),
            other => other,
        }
    }

    /// The `typeof`-style name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) | Self::View(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::View(a), Self::View(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(object) => write!(f, "Object({})", object.id()),
            Self::View(view) => write!(f, "View({})", view.raw().id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<Observable> for Value {
    fn from(view: Observable) -> Self {
        Self::View(view)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
