//! # hivemind-bridge
//!
//! Client for the Hivemind bridge WebSocket.
//!
//! Every command goes out as `{"cmd", "params", "id"}` on one socket; the
//! bridge answers with `{"success", "id", "results" | "error"}` in whatever
//! order the daemon finishes. [`Router`] matches answers to callers by id.
//!
//! - [`BridgeClient`]: connection plus one async method per command
//! - [`Router`] / [`PendingCall`]: id allocation and response correlation
//! - [`Command`]: the closed command catalog
//! - [`DaemonEndpoint`]: HTTP URLs for stored results

#![deny(unsafe_code)]

pub mod client;
pub mod commands;
pub mod daemon;
pub mod errors;
pub mod protocol;
pub mod router;

pub use client::BridgeClient;
pub use commands::{
    Command, FileRef, InternalRunParams, PackageRef, PackageSpec, ResultParams, RunParams,
};
pub use daemon::DaemonEndpoint;
pub use errors::{BridgeError, DaemonError, Result};
pub use protocol::{CommandEnvelope, ResponseEnvelope};
pub use router::{Dispatch, PendingCall, Router};
