//! Settings loading.
//!
//! Compiled defaults, then `~/.hivemind/settings.json` merged over them, then
//! `HIVEMIND_*` environment variables, then [`HivemindSettings::validate`].
//!
//! In the file layer, objects merge key by key, any other value replaces the
//! default it lands on, and `null` leaves the default in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::HivemindSettings;

/// Longest accepted request timeout (one hour).
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 3_600_000;

const BRIDGE_HOST: &str = "HIVEMIND_BRIDGE_HOST";
const BRIDGE_PORT: &str = "HIVEMIND_BRIDGE_PORT";
const BRIDGE_KEY: &str = "HIVEMIND_BRIDGE_KEY";
const DAEMON_SERVER: &str = "HIVEMIND_DAEMON_SERVER";
const DAEMON_PORT: &str = "HIVEMIND_DAEMON_PORT";
const REQUEST_TIMEOUT_MS: &str = "HIVEMIND_REQUEST_TIMEOUT_MS";
const LOG_LEVEL: &str = "HIVEMIND_LOG_LEVEL";

/// `~/.hivemind/settings.json`
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".hivemind").join("settings.json")
}

/// Load from [`settings_path`] with environment overrides.
pub fn load_settings() -> Result<HivemindSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path` with environment overrides.
///
/// A missing file means defaults. An unreadable or malformed file, or a
/// result that fails validation, is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HivemindSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<HivemindSettings> {
    let parse_err = |source: serde_json::Error| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut merged = serde_json::to_value(HivemindSettings::default()).map_err(parse_err)?;
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "merging settings file");
            let overlay: Value = serde_json::from_str(&text).map_err(parse_err)?;
            merge_into(&mut merged, overlay);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    serde_json::from_value(merged).map_err(parse_err)
}

/// Merge a user settings document into `base` in place.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `HIVEMIND_*` environment variables.
///
/// Blank variables are skipped. Unparseable ports and timeouts are dropped
/// with a warning and the file or default value stays.
pub fn apply_env_overrides(settings: &mut HivemindSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

fn apply_overrides_from(settings: &mut HivemindSettings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var(BRIDGE_HOST) {
        settings.bridge.host = host;
    }
    if let Some(port) = var(BRIDGE_PORT).and_then(|raw| accept(parse_port(BRIDGE_PORT, &raw))) {
        settings.bridge.port = port;
    }
    if let Some(key) = var(BRIDGE_KEY) {
        settings.bridge.key = key;
    }
    if let Some(server) = var(DAEMON_SERVER) {
        settings.daemon.server = server;
    }
    if let Some(port) = var(DAEMON_PORT).and_then(|raw| accept(parse_port(DAEMON_PORT, &raw))) {
        settings.daemon.port = port;
    }
    if let Some(ms) =
        var(REQUEST_TIMEOUT_MS).and_then(|raw| accept(parse_timeout_ms(REQUEST_TIMEOUT_MS, &raw)))
    {
        settings.request_timeout_ms = ms;
    }
    if let Some(level) = var(LOG_LEVEL) {
        settings.log_level = level;
    }
}

fn parse_port(key: &'static str, raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(SettingsError::invalid(
            key,
            format!("must be a port in 1..=65535, got '{raw}'"),
        )),
    }
}

fn parse_timeout_ms(key: &'static str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms <= MAX_REQUEST_TIMEOUT_MS)
        .ok_or_else(|| {
            SettingsError::invalid(
                key,
                format!("must be milliseconds in 0..={MAX_REQUEST_TIMEOUT_MS}, got '{raw}'"),
            )
        })
}

fn accept<T>(parsed: Result<T>) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "ignoring environment override");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
