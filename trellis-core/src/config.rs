//! Runtime Configuration
//!
//! Knobs that change how a [`Runtime`](crate::reactive::Runtime) behaves
//! without changing what it tracks. Configuration is plain data so it can be
//! embedded in a host application's own settings file.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of new wrapped objects between automatic registry purges.
pub const DEFAULT_PURGE_INTERVAL: usize = 1024;

/// Configuration for a reactive runtime.
///
/// # Example
///
/// ```rust
/// use trellis_core::config::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json_str(r#"{ "trace_operations": true }"#).unwrap();
/// assert!(config.trace_operations);
/// assert_eq!(config.purge_interval, trellis_core::config::DEFAULT_PURGE_INTERVAL);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit a `trace!` event for every tracked and triggered operation.
    pub trace_operations: bool,

    /// Purge dead registry entries after this many new registrations.
    /// Zero disables automatic purging; [`Runtime::purge`] still works.
    ///
    /// [`Runtime::purge`]: crate::reactive::Runtime::purge
    pub purge_interval: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace_operations: false,
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
