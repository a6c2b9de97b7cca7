//! WebSocket connection handling
//!
//! Each accepted socket runs one reader loop (frames are dispatched in
//! receipt order) and one writer task draining the peer's outbound queue.
//! A connection moves `Connecting → Open → Closed`; leaving `Open` by any
//! route unregisters the peer through [`PeerGuard`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::accept_async_with_config;

use crate::error::RelayError;
use crate::relay::hub::RelayHub;
use crate::relay::registry::PeerHandle;

/// How long a closing connection may spend flushing its outbound queue
const WRITER_DRAIN: Duration = Duration::from_secs(1);

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(50);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Lifecycle of one relay connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP accepted, WebSocket handshake pending
    Connecting,
    /// Registered with the hub and exchanging frames
    Open,
    Closed,
}

/// Why a connection left the `Open` state
#[derive(Debug)]
pub enum CloseReason {
    /// Peer sent a close frame or the stream ended
    Clean,
    /// Frame could not be handled
    Protocol(RelayError),
}

/// Removes the peer from the hub when dropped
pub struct PeerGuard {
    hub: Arc<RelayHub>,
    peer: Arc<PeerHandle>,
}

impl PeerGuard {
    pub fn new(hub: Arc<RelayHub>, peer: Arc<PeerHandle>) -> Self {
        Self { hub, peer }
    }

    pub fn peer(&self) -> &Arc<PeerHandle> {
        &self.peer
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.hub.detach(&self.peer);
    }
}

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, hub: Arc<RelayHub>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("relay listening on ws://{}", addr);
    }
    let mut failures: u32 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                failures = 0;
                tracing::debug!("accepted connection from {}", addr);
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    handle_connection(stream, addr, hub).await;
                });
            }
            Err(e) => {
                let delay = accept_backoff(failures);
                failures = failures.saturating_add(1);
                tracing::error!("failed to accept connection: {} (retrying in {:?})", e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Pause before the next accept after `failures` consecutive errors.
/// Doubles from 50ms up to 2s.
pub fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << failures.min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

/// Drive one connection from handshake to cleanup
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, hub: Arc<RelayHub>) -> ConnectionState {
    let mut state = ConnectionState::Connecting;
    tracing::debug!(peer = %addr, ?state, "connection state");

    let ws = match accept_async_with_config(stream, Some(unlimited_config())).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %addr, "WebSocket handshake failed: {}", e);
            return ConnectionState::Closed;
        }
    };
    let (mut sink, mut source) = ws.split();

    let (peer, rx) = hub.attach(Some(addr));
    let guard = PeerGuard::new(Arc::clone(&hub), peer);
    state = ConnectionState::Open;
    tracing::debug!(peer = %addr, ?state, "connection state");

    let mut writer = tokio::spawn(async move {
        let mut rx: mpsc::Receiver<String> = rx;
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame)).await {
                tracing::debug!(peer = %addr, "write failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reason = loop {
        let text = match source.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => break CloseReason::Protocol(RelayError::NonUtf8Frame),
            },
            Some(Ok(Message::Close(_))) | None => break CloseReason::Clean,
            Some(Ok(_)) => continue,
            Some(Err(e)) => break CloseReason::Protocol(RelayError::WebSocket(e)),
        };
        if let Err(e) = hub.dispatch(guard.peer(), &text).await {
            break CloseReason::Protocol(e);
        }
    };

    match &reason {
        CloseReason::Clean => tracing::info!(peer = %addr, "connection closed"),
        CloseReason::Protocol(e) => tracing::warn!(peer = %addr, "closing connection: {}", e),
    }

    // Unregistering drops the last sender, so the writer flushes what is
    // queued, sends the close frame and exits
    drop(guard);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        tracing::debug!(peer = %addr, "outbound queue not drained in time");
        writer.abort();
    }
    state = ConnectionState::Closed;
    tracing::debug!(peer = %addr, ?state, "connection state");
    state
}

/// No limit on message or frame size
fn unlimited_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = None;
    config.max_frame_size = None;
    config
}
