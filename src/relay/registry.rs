//! Live relay peers
//!
//! A peer is identified by its handle allocation: two handles are the same
//! peer only if they are the same `Arc`. Broadcasts work from a snapshot
//! copied under the lock, so sends never hold the lock and adds/removes
//! during a broadcast cannot disturb it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Why a frame did not reach a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("peer queue stayed full past the send timeout")]
    Timeout,
    #[error("peer connection is closed")]
    Closed,
}

/// Sending side of one connection
#[derive(Debug)]
pub struct PeerHandle {
    addr: Option<SocketAddr>,
    outbound: mpsc::Sender<String>,
}

impl PeerHandle {
    /// New handle plus the receiver its writer task drains
    pub fn channel(addr: Option<SocketAddr>, capacity: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self { addr, outbound }), rx)
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Queue `frame`, waiting at most `timeout` for room
    pub async fn deliver(&self, frame: String, timeout: Duration) -> Result<(), DeliveryError> {
        self.outbound
            .send_timeout(frame, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout,
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl std::fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.addr {
            Some(addr) => write!(f, "{}", addr),
            None => write!(f, "peer@{:p}", self),
        }
    }
}

/// The set of connected peers, in attach order
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<Vec<Arc<PeerHandle>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Adding the same handle twice keeps one entry.
    pub fn add(&self, peer: Arc<PeerHandle>) -> bool {
        let mut peers = self.peers.lock();
        if peers.iter().any(|p| Arc::ptr_eq(p, &peer)) {
            return false;
        }
        peers.push(peer);
        true
    }

    /// Remove a peer. Removing an absent peer is a no-op.
    pub fn remove(&self, peer: &Arc<PeerHandle>) -> bool {
        let mut peers = self.peers.lock();
        let before = peers.len();
        peers.retain(|p| !Arc::ptr_eq(p, peer));
        before != peers.len()
    }

    /// Copy of the current peer set
    pub fn snapshot(&self) -> Vec<Arc<PeerHandle>> {
        self.peers.lock().clone()
    }

    pub fn contains(&self, peer: &Arc<PeerHandle>) -> bool {
        self.peers.lock().iter().any(|p| Arc::ptr_eq(p, peer))
    }

    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_snapshot() {
        let registry = PeerRegistry::new();
        let (a, _rx_a) = PeerHandle::channel(None, 4);
        let (b, _rx_b) = PeerHandle::channel(None, 4);

        assert!(registry.add(a.clone()));
        assert!(registry.add(b.clone()));
        assert!(!registry.add(a.clone()));
        assert_eq!(registry.len(), 2);

        let snapshot = registry.snapshot();
        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));

        assert_eq!(snapshot.len(), 2, "snapshot is unaffected by later removal");
        assert!(Arc::ptr_eq(&snapshot[0], &a));
        assert!(!registry.contains(&a));
        assert!(registry.contains(&b));
    }

    #[test]
    fn test_identity_is_the_handle() {
        let registry = PeerRegistry::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let (a, _rx_a) = PeerHandle::channel(Some(addr), 4);
        let (b, _rx_b) = PeerHandle::channel(Some(addr), 4);
        registry.add(a.clone());
        assert!(registry.add(b.clone()), "same address, different peer");
        registry.remove(&b);
        assert!(registry.contains(&a));
    }

    #[tokio::test]
    async fn test_deliver_errors() {
        let (peer, rx) = PeerHandle::channel(None, 1);
        let timeout = Duration::from_millis(20);
        peer.deliver("one".to_string(), timeout).await.unwrap();
        assert_eq!(
            peer.deliver("two".to_string(), timeout).await,
            Err(DeliveryError::Timeout)
        );
        drop(rx);
        assert_eq!(
            peer.deliver("three".to_string(), timeout).await,
            Err(DeliveryError::Closed)
        );
    }

    #[test]
    fn test_concurrent_mutation() {
        let registry = Arc::new(PeerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let (peer, _rx) = PeerHandle::channel(None, 1);
                        registry.add(peer.clone());
                        let _ = registry.snapshot();
                        registry.remove(&peer);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
