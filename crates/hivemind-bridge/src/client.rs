//! Bridge client: one WebSocket connection plus typed command methods.
//!
//! A background task owns the socket. It writes frames handed to it by
//! [`BridgeClient::send`] and feeds every inbound text frame to the
//! [`Router`]. When the socket ends, all still-pending calls fail with
//! [`BridgeError::ConnectionClosed`].

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use hivemind_settings::HivemindSettings;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::commands::{
    Command, FileRef, InternalRunParams, PackageRef, PackageSpec, ResultParams, RunParams,
};
use crate::daemon::DaemonEndpoint;
use crate::errors::{BridgeError, Result};
use crate::router::{PendingCall, Router};

/// Outbound frame queue depth.
const OUTBOUND_CAPACITY: usize = 64;

/// How long [`BridgeClient::close`] waits for the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Client for the bridge WebSocket.
pub struct BridgeClient {
    router: Arc<Router>,
    outbound: mpsc::Sender<String>,
    daemon: DaemonEndpoint,
    request_timeout: Option<Duration>,
    handler: JoinHandle<()>,
}

impl BridgeClient {
    /// Connect to `ws://<host>:<port>/<key>` from `settings`.
    pub async fn connect(settings: &HivemindSettings) -> Result<Self> {
        let url = settings.bridge.ws_url();
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| BridgeError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        info!(%url, "connected to bridge");
        Ok(Self::from_stream(ws, settings))
    }

    /// Wrap an already-open WebSocket.
    pub fn from_stream<S>(ws: WebSocketStream<S>, settings: &HivemindSettings) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let router = Router::new();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let handler = tokio::spawn(connection_loop(ws, outbound_rx, Arc::clone(&router)));
        Self {
            router,
            outbound,
            daemon: DaemonEndpoint::from(&settings.daemon),
            request_timeout: settings.request_timeout(),
            handler,
        }
    }

    // ─── Raw commands ────────────────────────────────────────────────────

    /// Transmit `command` and return a handle for its response.
    ///
    /// The handle is not bounded by the configured timeout; use
    /// [`PendingCall::wait_timeout`] or [`call`](Self::call) for that.
    pub async fn send(&self, command: Command) -> Result<PendingCall> {
        let (frame, call) = self.router.register(&command)?;
        debug!(id = %call.id(), cmd = call.command(), "sending command");
        self.outbound
            .send(frame)
            .await
            .map_err(|_| BridgeError::ConnectionClosed)?;
        Ok(call)
    }

    /// Transmit `command` and wait for its result under the configured timeout.
    pub async fn call(&self, command: Command) -> Result<Value> {
        self.send(command)
            .await?
            .wait_for(self.request_timeout)
            .await
    }

    // ─── Typed commands ──────────────────────────────────────────────────

    /// `heartbeat`: check that the bridge and daemon are reachable.
    pub async fn heartbeat(&self) -> Result<Value> {
        self.call(Command::Heartbeat).await
    }

    /// `run`: invoke a package entry point.
    pub async fn run(&self, target: &str, params: Map<String, Value>) -> Result<Value> {
        self.call(Command::Run(RunParams {
            target: target.to_string(),
            params,
        }))
        .await
    }

    /// `_run`: invoke a model directly.
    pub async fn run_internal(
        &self,
        target_package: &str,
        target_model: &str,
        params: Map<String, Value>,
    ) -> Result<Value> {
        self.call(Command::RunInternal(InternalRunParams {
            target_package: target_package.to_string(),
            target_model: target_model.to_string(),
            params,
        }))
        .await
    }

    /// `result`: fetch a stored result by hash.
    pub async fn result(&self, result_hash: &str) -> Result<Value> {
        self.call(Command::Result(ResultParams {
            result_hash: result_hash.to_string(),
        }))
        .await
    }

    /// `package.install`
    pub async fn package_install(&self, spec: PackageSpec) -> Result<Value> {
        self.call(Command::PackageInstall(spec)).await
    }

    /// `package.fetch`
    pub async fn package_fetch(&self, spec: PackageSpec) -> Result<Value> {
        self.call(Command::PackageFetch(spec)).await
    }

    /// `package.activate`
    pub async fn package_activate(&self, name: &str, version: Option<&str>) -> Result<Value> {
        self.call(Command::PackageActivate(PackageRef::new(name, version)))
            .await
    }

    /// `package.deactivate`
    pub async fn package_deactivate(&self, name: &str, version: Option<&str>) -> Result<Value> {
        self.call(Command::PackageDeactivate(PackageRef::new(name, version)))
            .await
    }

    /// `package.remove`
    pub async fn package_remove(&self, name: &str, version: Option<&str>) -> Result<Value> {
        self.call(Command::PackageRemove(PackageRef::new(name, version)))
            .await
    }

    /// `package.list`
    pub async fn package_list(&self) -> Result<Value> {
        self.call(Command::PackageList).await
    }

    /// `bridge.get_daemon`: ask the bridge where the daemon's HTTP server is.
    pub async fn get_daemon(&self) -> Result<DaemonEndpoint> {
        let value = self.call(Command::GetDaemon).await?;
        serde_json::from_value(value).map_err(|e| BridgeError::UnexpectedResult {
            command: Command::GetDaemon.name().to_string(),
            reason: e.to_string(),
        })
    }

    // ─── Stored results ──────────────────────────────────────────────────

    /// URL of the stored result a [`FileRef`] points at, on the configured
    /// daemon.
    pub fn file_url(&self, file: &FileRef) -> String {
        self.daemon.file_url(file)
    }

    // ─── Connection state ────────────────────────────────────────────────

    /// Calls still waiting on a response.
    pub fn pending_count(&self) -> usize {
        self.router.pending_count()
    }

    /// Whether the connection task is still running.
    pub fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }

    /// Close the socket and fail any pending calls.
    pub async fn close(self) {
        let Self {
            outbound, handler, ..
        } = self;
        drop(outbound);
        let abort = handler.abort_handle();
        if tokio::time::timeout(CLOSE_GRACE, handler).await.is_err() {
            warn!("bridge close handshake timed out, aborting");
            abort.abort();
        }
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("daemon", &self.daemon)
            .field("request_timeout", &self.request_timeout)
            .field("pending", &self.router.pending_count())
            .finish_non_exhaustive()
    }
}

/// Socket task.
///
/// Writes queued frames, routes inbound frames, and fails pending calls
/// once either side goes away.
async fn connection_loop<S>(
    ws: WebSocketStream<S>,
    mut outbound: mpsc::Receiver<String>,
    router: Arc<Router>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    debug!("client closed, sending close frame");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "bridge write failed");
                    break;
                }
            }
            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(error = %e, "bridge read failed");
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => {
                        if let Err(e) = router.dispatch(text.as_str()) {
                            error!(error = %e, "dropping bridge frame");
                        }
                    }
                    Message::Close(frame) => {
                        debug!(?frame, "bridge sent close");
                        break;
                    }
                    Message::Binary(bytes) => {
                        debug!(len = bytes.len(), "ignoring binary frame");
                    }
                    _ => {}
                }
            }
        }
    }

    // Later sends fail fast; anything already queued is settled by fail_all
    outbound.close();
    let failed = router.fail_all();
    if failed > 0 {
        warn!(failed, "bridge connection closed with commands pending");
    } else {
        info!("bridge connection closed");
    }
}
