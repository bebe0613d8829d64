//! Bridge error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from bridge connection and command operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Could not open the bridge WebSocket.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// The bridge URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// An inbound frame was not a valid response envelope.
    #[error("malformed bridge response: {0}")]
    MalformedResponse(String),

    /// The daemon answered with `success: false`.
    #[error("command failed: {0}")]
    CommandFailed(DaemonError),

    /// The connection ended before the response arrived.
    #[error("bridge connection closed")]
    ConnectionClosed,

    /// No response within the allotted time.
    #[error("timed out after {timeout_ms}ms waiting for '{command}'")]
    Timeout {
        /// How long we waited.
        timeout_ms: u64,
        /// The command name.
        command: String,
    },

    /// Command parameters could not be serialized.
    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The response payload did not have the expected shape.
    #[error("unexpected result for '{command}': {reason}")]
    UnexpectedResult {
        /// The command name.
        command: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error body carried by a `success: false` response.
///
/// ```json
/// { "name": "Connection Refused", "msg": "daemon unreachable", "data": {} }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonError {
    /// Error class name.
    #[serde(default = "DaemonError::unknown_name")]
    pub name: String,
    /// Human-readable message.
    #[serde(default)]
    pub msg: String,
    /// Structured details.
    #[serde(default)]
    pub data: Value,
}

impl DaemonError {
    const UNKNOWN: &'static str = "Unknown Error";

    fn unknown_name() -> String {
        Self::UNKNOWN.to_string()
    }

    /// Build from whatever the `error` field of a failure envelope holds.
    ///
    /// Objects are read field by field, strings become the message, and
    /// anything else is kept verbatim in `data`.
    pub fn from_payload(payload: Option<Value>) -> Self {
        match payload {
            Some(Value::String(msg)) => Self {
                name: Self::unknown_name(),
                msg,
                data: Value::Null,
            },
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value.clone()).unwrap_or_else(|_| Self {
                    name: Self::unknown_name(),
                    msg: String::new(),
                    data: value,
                })
            }
            Some(Value::Null) | None => Self {
                name: Self::unknown_name(),
                msg: String::new(),
                data: Value::Null,
            },
            Some(other) => Self {
                name: Self::unknown_name(),
                msg: String::new(),
                data: other,
            },
        }
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.msg)
        }
    }
}
