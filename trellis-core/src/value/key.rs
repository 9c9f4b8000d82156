//! Property keys.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The closed set of language-level symbols that never carry user data.
///
/// Reads through these keys are protocol lookups (iteration, coercion,
/// `instanceof`), so the interception layer does not record them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    MatchAll,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

impl WellKnownSymbol {
    fn description(self) -> &'static str {
        match self {
            Self::AsyncIterator => "Symbol.asyncIterator",
            Self::HasInstance => "Symbol.hasInstance",
            Self::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            Self::Iterator => "Symbol.iterator",
            Self::Match => "Symbol.match",
            Self::MatchAll => "Symbol.matchAll",
            Self::Replace => "Symbol.replace",
            Self::Search => "Symbol.search",
            Self::Species => "Symbol.species",
            Self::Split => "Symbol.split",
            Self::ToPrimitive => "Symbol.toPrimitive",
            Self::ToStringTag => "Symbol.toStringTag",
            Self::Unscopables => "Symbol.unscopables",
        }
    }
}

/// A symbol key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    WellKnown(WellKnownSymbol),
    /// A user-created symbol. Identity is the id; the description is cosmetic.
    Unique { id: u64, description: Arc<str> },
}

impl Symbol {
    /// Create a fresh symbol distinct from every other symbol.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self::Unique {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn is_well_known(&self) -> bool {
        matches!(self, Self::WellKnown(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WellKnown(symbol) => write!(f, "{}", symbol.description()),
            Self::Unique { description, .. } => write!(f, "Symbol({description})"),
        }
    }
}

/// A property key: a string or a symbol.
///
/// Array indices are ordinary string keys in canonical decimal form, as in
/// the object model being emulated; [`PropertyKey::array_index`] recognises
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(Arc<str>),
    Symbol(Symbol),
}

impl PropertyKey {
    /// The `length` key of arrays.
    pub fn length() -> Self {
        Self::String(Arc::from("length"))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }

    pub fn is_well_known_symbol(&self) -> bool {
        matches!(self, Self::Symbol(symbol) if symbol.is_well_known())
    }

    /// Parse the key as a canonical array index (`"0"`, `"17"`, not `"017"`).
    pub fn array_index(&self) -> Option<usize> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // The largest valid index is 2^32 - 2.
        let index: u64 = s.parse().ok()?;
        (index < u32::MAX as u64).then_some(index as usize)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        Self::String(Arc::from(index.to_string()))
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl From<WellKnownSymbol> for PropertyKey {
    fn from(symbol: WellKnownSymbol) -> Self {
        Self::Symbol(Symbol::WellKnown(symbol))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}
