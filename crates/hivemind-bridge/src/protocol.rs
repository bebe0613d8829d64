//! Wire-format envelopes for the bridge socket.
//!
//! Outbound: `{"cmd": "...", "params": {...}, "id": 0}`
//!
//! Inbound success: `{"success": true, "id": 0, "results": ...}`
//!
//! Inbound failure: `{"success": false, "id": 0, "error": {"name", "msg", "data"}}`

use hivemind_core::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BridgeError, DaemonError, Result};

/// Outgoing command frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Command name, e.g. `package.list`.
    pub cmd: String,
    /// Parameters object.
    pub params: Value,
    /// Correlation identifier.
    pub id: RequestId,
}

impl CommandEnvelope {
    /// Serialize to a text frame.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Incoming response frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    /// Whether the command succeeded.
    pub success: bool,
    /// Correlation identifier; failures raised before a command was parsed
    /// may omit it.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Result payload on success.
    #[serde(default)]
    pub results: Value,
    /// Error payload on failure.
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::MalformedResponse(e.to_string()))
    }

    /// Turn the envelope into the value delivered to the waiting caller.
    pub fn into_outcome(self) -> Result<Value> {
        if self.success {
            Ok(self.results)
        } else {
            Err(BridgeError::CommandFailed(DaemonError::from_payload(
                self.error,
            )))
        }
    }
}
