//! # hivemind-settings
//!
//! Configuration for the Hivemind bridge client, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`HivemindSettings::default()`]
//! 2. **User file**: `~/.hivemind/settings.json` (merged over defaults)
//! 3. **Environment variables**: `HIVEMIND_*` overrides (highest priority)
//!
//! Settings are plain values handed to the client at construction time;
//! there is no process-wide instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    MAX_REQUEST_TIMEOUT_MS, apply_env_overrides, load_settings, load_settings_from_path, merge_into,
    settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = HivemindSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = HivemindSettings::default();
        assert_eq!(settings.bridge.host, "localhost");
        assert_eq!(settings.bridge.port, 5403);
        assert!(settings.bridge.key.is_empty());
        assert_eq!(settings.daemon.server, "127.0.0.1");
        assert_eq!(settings.daemon.port, 5402);
        assert_eq!(settings.request_timeout_ms, 30_000);
        assert_eq!(settings.log_level, "warn");
    }
}
