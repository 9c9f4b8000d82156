//! Trellis Core
//!
//! This crate provides a fine-grained reactive runtime for plain data.
//! It implements:
//!
//! - A dynamic object model (plain objects, arrays, prototype chains)
//! - Views that intercept every access to an object
//! - A dependency store mapping `(object, key)` to the reactions that read it
//! - Reactions that re-run, or get scheduled, when something they read changes
//!
//! No subscription boilerplate is needed: whatever a reaction reads through
//! a view during its last run is exactly what it depends on.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: The object model and the reflective algorithms over it
//! - `intercept`: Views, trap sets and the identity registry
//! - `graph`: Operations and the dependency store
//! - `reactive`: The runtime, reactions, schedulers and the observer API
//! - `config`: Runtime configuration
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use trellis_core::{ObjectRef, ObserveOptions, Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let counter = runtime.observable(ObjectRef::from_entries([("num", 0)])).unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_clone = seen.clone();
//! let view = counter.clone();
//! let _reaction = runtime
//!     .observe(
//!         move |_: &[Value]| {
//!             seen_clone.lock().push(view.get("num"));
//!             Ok(Value::Undefined)
//!         },
//!         ObserveOptions::new(),
//!     )
//!     .unwrap();
//!
//! counter.set("num", 1);
//! // Writing the same value again is not a change.
//! counter.set("num", 1);
//! assert_eq!(*seen.lock(), vec![Value::from(0), Value::from(1)]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod intercept;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use graph::{Operation, OperationKind};
pub use intercept::{BaseHandlers, DefaultPolicy, InstrumentationPolicy, Observable, TrapSet};
pub use reactive::{
    IntoReaction, ObserveOptions, Reaction, ReactionId, ReactionQueue, Runtime, RuntimeBuilder,
    Scheduler,
};
pub use value::{ObjectRef, PropertyKey, Value};
