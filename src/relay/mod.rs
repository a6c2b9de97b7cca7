//! Realtime chat relay
//!
//! Bridges the browser's virtual chat client and backend plugin clients.
//! Every connection is a peer of one [`RelayHub`]:
//!
//! ```text
//!   browser ──┐                          ┌──► plugin A
//!             ├──► RelayHub ──translate──┤
//!   plugin B ─┘    (PeerRegistry)        └──► plugin B (not the sender)
//! ```
//!
//! - `{"echo": ...}` frames are answered with an acknowledgment sent to all
//!   peers, the sender included
//! - any other JSON value becomes a group message event sent to every peer
//!   except the sender; arrays get a leading mention fragment
//! - frames carrying `auth_token` are front-end handshakes and go nowhere
//! - a frame that is not JSON closes that connection only

pub mod connection;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod translator;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::error::RelayError;

pub use connection::{handle_connection, serve, ConnectionState, PeerGuard};
pub use hub::{BroadcastReport, FrameKind, RelayHub};
pub use protocol::{Acknowledgment, RelayEvent, RelayIdentity};
pub use registry::{DeliveryError, PeerHandle, PeerRegistry};
pub use translator::{EnvelopeTranslator, Translation};

/// Bind the relay listener described by `config`
pub async fn bind(config: &RelayConfig) -> Result<(TcpListener, Arc<RelayHub>), RelayError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    Ok((listener, Arc::new(RelayHub::from_config(config))))
}

/// Address the listener ended up on (useful with port 0)
pub fn local_addr(listener: &TcpListener) -> Result<SocketAddr, RelayError> {
    Ok(listener.local_addr()?)
}
