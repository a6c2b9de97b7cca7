//! Relay hub: registry + translator + broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value as Json;
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::registry::{PeerHandle, PeerRegistry};
use crate::relay::translator::{EnvelopeTranslator, Translation};

/// Kind of frame a dispatch produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Acknowledgment,
    Event,
    Withheld,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub kind: FrameKind,
    /// Peers in the snapshot after exclusions
    pub targets: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    fn withheld() -> Self {
        Self {
            kind: FrameKind::Withheld,
            targets: 0,
            delivered: 0,
            failed: 0,
        }
    }
}

/// Shared state of the relay server
#[derive(Debug)]
pub struct RelayHub {
    registry: PeerRegistry,
    translator: EnvelopeTranslator,
    send_timeout: Duration,
    queue_capacity: usize,
}

impl RelayHub {
    pub fn new(translator: EnvelopeTranslator, send_timeout: Duration, queue_capacity: usize) -> Self {
        Self {
            registry: PeerRegistry::new(),
            translator,
            send_timeout,
            queue_capacity,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            EnvelopeTranslator::new(config.identity.clone()),
            config.send_timeout(),
            config.queue_capacity,
        )
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Register a new peer and hand back the receiver its writer drains
    pub fn attach(&self, addr: Option<SocketAddr>) -> (Arc<PeerHandle>, mpsc::Receiver<String>) {
        let (peer, rx) = PeerHandle::channel(addr, self.queue_capacity);
        self.registry.add(Arc::clone(&peer));
        tracing::info!(peer = %peer, peers = self.registry.len(), "peer attached");
        (peer, rx)
    }

    /// Unregister a peer. Safe to call more than once.
    pub fn detach(&self, peer: &Arc<PeerHandle>) -> bool {
        let removed = self.registry.remove(peer);
        if removed {
            tracing::info!(peer = %peer, peers = self.registry.len(), "peer detached");
        }
        removed
    }

    /// Handle one text frame received from `origin`.
    ///
    /// Malformed JSON is an error for the caller to treat as fatal to the
    /// connection; nothing is broadcast for it.
    pub async fn dispatch(&self, origin: &Arc<PeerHandle>, text: &str) -> Result<BroadcastReport, RelayError> {
        let payload: Json = serde_json::from_str(text).map_err(|e| RelayError::InvalidFrame {
            message: e.to_string(),
        })?;
        tracing::debug!(peer = %origin, "received frame");

        let (kind, frame, exclude) = match self.translator.translate(payload) {
            Translation::Acknowledge(ack) => (FrameKind::Acknowledgment, encode(&ack)?, None),
            Translation::Event(event) => (FrameKind::Event, encode(&event)?, Some(origin)),
            Translation::Withheld => {
                tracing::debug!(peer = %origin, "withholding handshake frame");
                return Ok(BroadcastReport::withheld());
            }
        };
        Ok(self.broadcast(kind, frame, exclude).await)
    }

    /// Deliver `frame` to every peer in the current snapshot except `exclude`.
    ///
    /// Deliveries run concurrently and each is bounded by the send timeout,
    /// so one slow peer delays nobody else.
    pub async fn broadcast(&self, kind: FrameKind, frame: String, exclude: Option<&Arc<PeerHandle>>) -> BroadcastReport {
        let targets: Vec<Arc<PeerHandle>> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|peer| exclude.map_or(true, |origin| !Arc::ptr_eq(peer, origin)))
            .collect();

        let timeout = self.send_timeout;
        let results = join_all(targets.iter().map(|peer| {
            let frame = frame.clone();
            async move { (peer, peer.deliver(frame, timeout).await) }
        }))
        .await;

        let mut report = BroadcastReport {
            kind,
            targets: targets.len(),
            delivered: 0,
            failed: 0,
        };
        for (peer, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(peer = %peer, "delivery failed: {}", e);
                }
            }
        }
        tracing::debug!(
            kind = ?report.kind,
            targets = report.targets,
            delivered = report.delivered,
            failed = report.failed,
            "broadcast finished"
        );
        report
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, RelayError> {
    serde_json::to_string(value).map_err(|e| RelayError::InvalidFrame {
        message: format!("failed to encode frame: {}", e),
    })
}
