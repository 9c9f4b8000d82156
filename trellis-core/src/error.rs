//! Error types.
//!
//! Most of the engine follows `Reflect` conventions and reports a refused
//! write or delete as `false` instead of an error. The variants here cover
//! what is left: failures of user computations, misuse of the typed helpers,
//! and configuration or snapshot problems.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the reactive engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A reaction's computation reported a failure.
    #[error("computation failed: {0}")]
    Computation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The instrumentation policy refused to wrap the object.
    #[error("object {0} cannot be instrumented")]
    NotInstrumentable(u64),

    /// A primitive was used where an object was required.
    #[error("expected an object, found {0}")]
    NotAnObject(&'static str),

    /// A snapshot walked back into an object it was already serializing.
    #[error("cannot snapshot a cyclic object graph (object {0})")]
    Cycle(u64),

    /// A snapshot met an array too long to materialise.
    #[error("cannot snapshot an array of length {0}")]
    ArrayTooLong(u64),

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Computation`] from a plain message.
    pub fn computation(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Computation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_error_keeps_message() {
        let err = Error::computation("boom");
        assert_eq!(err.to_string(), "computation failed: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn config_error_converts_from_serde() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
