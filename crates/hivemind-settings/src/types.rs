//! Settings types.
//!
//! All structs use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file fills the gaps from compiled defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HivemindSettings {
    /// Bridge socket the client connects to.
    pub bridge: BridgeSettings,
    /// Daemon HTTP endpoint used for stored-result URLs.
    pub daemon: DaemonSettings,
    /// Default wait for a command response in milliseconds (0 waits forever).
    pub request_timeout_ms: u64,
    /// Default tracing filter directive.
    pub log_level: String,
}

impl Default for HivemindSettings {
    fn default() -> Self {
        Self {
            bridge: BridgeSettings::default(),
            daemon: DaemonSettings::default(),
            request_timeout_ms: 30_000,
            log_level: "warn".to_string(),
        }
    }
}

impl HivemindSettings {
    /// Default response timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Reject values that cannot produce a usable connection.
    pub fn validate(&self) -> Result<()> {
        if self.bridge.host.is_empty() {
            return Err(SettingsError::invalid("bridge.host", "must not be empty"));
        }
        if self.bridge.port == 0 {
            return Err(SettingsError::invalid("bridge.port", "must be in 1..=65535"));
        }
        if self.bridge.key.contains('/') {
            return Err(SettingsError::invalid("bridge.key", "must not contain '/'"));
        }
        if self.daemon.server.is_empty() {
            return Err(SettingsError::invalid("daemon.server", "must not be empty"));
        }
        if self.daemon.port == 0 {
            return Err(SettingsError::invalid("daemon.port", "must be in 1..=65535"));
        }
        Ok(())
    }
}

/// Bridge WebSocket connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Bridge host.
    pub host: String,
    /// Bridge port.
    pub port: u16,
    /// Access key placed in the connection path.
    pub key: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5403,
            key: String::new(),
        }
    }
}

impl BridgeSettings {
    /// `ws://<host>:<port>/<key>`
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/{}", self.host, self.port, self.key)
    }
}

/// Daemon HTTP endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSettings {
    /// Daemon host name or address.
    pub server: String,
    /// Daemon HTTP port.
    pub port: u16,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            server: "127.0.0.1".to_string(),
            port: 5402,
        }
    }
}
