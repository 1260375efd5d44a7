//! Dispatcher configuration.
//!
//! ```toml
//! max_listeners = 25
//! warn_on_max_listeners = true
//! listener_timeout_ms = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Listener threshold used when nothing else is configured.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Errors that can occur while loading a [`DispatcherConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Failed to parse dispatcher config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings applied when a [`Dispatcher`](crate::Dispatcher) is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Listener count per event above which `maxListenersPassed` fires.
    /// `0` disables the check.
    pub max_listeners: usize,
    /// Whether to install the default `maxListenersPassed` warning listener
    pub warn_on_max_listeners: bool,
    /// Per-listener limit for suspending listeners in `emit`, in milliseconds
    pub listener_timeout_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            warn_on_max_listeners: true,
            listener_timeout_ms: None,
        }
    }
}

impl DispatcherConfig {
    /// Parse a configuration from a TOML document.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Listener timeout as a [`Duration`].
    pub fn listener_timeout(&self) -> Option<Duration> {
        self.listener_timeout_ms.map(Duration::from_millis)
    }
}
