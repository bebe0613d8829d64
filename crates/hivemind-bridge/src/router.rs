//! Request router: correlation ids and the pending-call table.
//!
//! The router never touches the socket. [`Router::register`] turns a command
//! into a text frame plus a [`PendingCall`]; the connection's reader feeds
//! every inbound frame to [`Router::dispatch`], which resolves the call with
//! the matching id. Arrival order does not matter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use hivemind_core::RequestId;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::commands::Command;
use crate::errors::{BridgeError, Result};
use crate::protocol::{CommandEnvelope, ResponseEnvelope};

/// Continuation for a command waiting on its response.
type PendingTx = oneshot::Sender<Result<Value>>;

struct PendingEntry {
    cmd: &'static str,
    tx: PendingTx,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<RequestId, PendingEntry>,
    /// Set once the connection is gone; nothing can resolve new entries.
    closed: bool,
}

/// What [`Router::dispatch`] did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A pending call received its result.
    Resolved(RequestId),
    /// A pending call received a failure.
    Failed(RequestId),
    /// No pending call has this id (already resolved, abandoned, or never sent).
    Unmatched(RequestId),
    /// A failure arrived without an id.
    Uncorrelated,
}

/// Assigns ids and routes responses back to their callers.
pub struct Router {
    next_id: AtomicU64,
    pending: Mutex<PendingTable>,
}

impl Router {
    /// A router for a fresh connection; the first id is 0.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(RequestId::FIRST.get()),
            pending: Mutex::new(PendingTable::default()),
        })
    }

    /// Allocate an id for `command`, record it as pending, and return the
    /// frame to transmit along with the caller's handle.
    ///
    /// Fails with [`BridgeError::ConnectionClosed`] after [`fail_all`](Self::fail_all).
    pub fn register(self: &Arc<Self>, command: &Command) -> Result<(String, PendingCall)> {
        let params = command.params()?;
        let cmd = command.name();
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let frame = CommandEnvelope {
            cmd: cmd.to_string(),
            params,
            id,
        }
        .to_text()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.pending.lock();
            if table.closed {
                return Err(BridgeError::ConnectionClosed);
            }
            let _ = table.entries.insert(id, PendingEntry { cmd, tx });
        }

        let call = PendingCall {
            id,
            cmd,
            rx,
            router: Arc::downgrade(self),
        };
        Ok((frame, call))
    }

    /// Route one inbound text frame.
    ///
    /// Malformed frames are returned as errors; frames for unknown ids are
    /// reported as [`Dispatch::Unmatched`] and otherwise ignored.
    pub fn dispatch(&self, text: &str) -> Result<Dispatch> {
        let envelope = ResponseEnvelope::parse(text)?;
        let success = envelope.success;

        let Some(id) = envelope.id else {
            if success {
                return Err(BridgeError::MalformedResponse(
                    "success response without id".into(),
                ));
            }
            let err = envelope.into_outcome().err();
            warn!(error = ?err, "bridge failure without correlation id");
            return Ok(Dispatch::Uncorrelated);
        };

        let Some(entry) = self.pending.lock().entries.remove(&id) else {
            debug!(%id, success, "response for unknown id, ignoring");
            return Ok(Dispatch::Unmatched(id));
        };

        let outcome = envelope.into_outcome();
        let dispatch = match &outcome {
            Ok(_) => {
                debug!(%id, cmd = entry.cmd, "command resolved");
                Dispatch::Resolved(id)
            }
            Err(e) => {
                warn!(%id, cmd = entry.cmd, error = %e, "command failed");
                Dispatch::Failed(id)
            }
        };
        // Receiver gone means the caller stopped listening
        let _ = entry.tx.send(outcome);
        Ok(dispatch)
    }

    /// Drop the pending entry for `id`. Returns whether one existed.
    pub fn forget(&self, id: RequestId) -> bool {
        self.pending.lock().entries.remove(&id).is_some()
    }

    /// Resolve every pending call with [`BridgeError::ConnectionClosed`] and
    /// refuse further registrations.
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut table = self.pending.lock();
            table.closed = true;
            table.entries.drain().collect()
        };
        let count = drained.len();
        for (id, entry) in drained {
            debug!(%id, cmd = entry.cmd, "failing pending command on close");
            let _ = entry.tx.send(Err(BridgeError::ConnectionClosed));
        }
        count
    }

    /// Number of calls still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().entries.len()
    }

    /// Whether [`fail_all`](Self::fail_all) has run.
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    /// Whether `id` is still waiting.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.lock().entries.contains_key(&id)
    }
}

/// Caller-side handle for one in-flight command.
///
/// Await it with [`wait`](Self::wait) or [`wait_timeout`](Self::wait_timeout).
/// Dropping the handle removes the pending entry; a late response for it is
/// then ignored.
pub struct PendingCall {
    id: RequestId,
    cmd: &'static str,
    rx: oneshot::Receiver<Result<Value>>,
    router: Weak<Router>,
}

impl PendingCall {
    /// Correlation id assigned to this call.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Command name.
    pub fn command(&self) -> &'static str {
        self.cmd
    }

    /// Wait for the response with no time limit.
    pub async fn wait(mut self) -> Result<Value> {
        (&mut self.rx)
            .await
            .unwrap_or_else(|_| Err(BridgeError::ConnectionClosed))
    }

    /// Wait for the response, giving up after `timeout`.
    pub async fn wait_timeout(mut self, timeout: Duration) -> Result<Value> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(received) => received.unwrap_or_else(|_| Err(BridgeError::ConnectionClosed)),
            Err(_) => {
                debug!(id = %self.id, cmd = self.cmd, "command timed out");
                Err(BridgeError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    command: self.cmd.to_string(),
                })
            }
        }
    }

    /// Wait with an optional limit.
    pub async fn wait_for(self, timeout: Option<Duration>) -> Result<Value> {
        match timeout {
            Some(t) => self.wait_timeout(t).await,
            None => self.wait().await,
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let Some(router) = self.router.upgrade() {
            let _ = router.forget(self.id);
        }
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("cmd", &self.cmd)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
