//! Daemon HTTP endpoint and stored-result URLs.

use hivemind_settings::DaemonSettings;
use serde::{Deserialize, Serialize};

use crate::commands::FileRef;

/// Where the daemon serves stored results over HTTP.
///
/// Reported by `bridge.get_daemon`; the configured default comes from
/// [`DaemonSettings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonEndpoint {
    /// Host name or address.
    pub server: String,
    /// HTTP port.
    pub port: u16,
}

impl DaemonEndpoint {
    /// `http://<server>:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server, self.port)
    }

    /// URL of the stored result with content key `key`.
    pub fn result_url(&self, key: &str) -> String {
        format!("{}/result/{key}", self.base_url())
    }

    /// URL of the stored result a [`FileRef`] points at.
    pub fn file_url(&self, file: &FileRef) -> String {
        self.result_url(&file.file_ref)
    }
}

impl From<&DaemonSettings> for DaemonEndpoint {
    fn from(settings: &DaemonSettings) -> Self {
        Self {
            server: settings.server.clone(),
            port: settings.port,
        }
    }
}
