//! Transport layer: opening message-oriented connections.
//!
//! A [`Connector`] opens a [`Link`] to an address. The link is a pair of
//! channels: text frames go out through [`Link::outgoing`], and
//! [`TransportEvent`]s come back through [`Link::incoming`]. Dropping the
//! outgoing sender closes the underlying connection.
//!
//! The channels are unbounded so that neither the connection manager nor
//! the socket pump ever waits on the other.

pub mod memory;
pub mod websocket;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::BridgeError;

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

/// Something that happened on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Message(String),
    /// The transport reported an error. A [`TransportEvent::Closed`]
    /// always follows.
    Error(String),
    /// The connection is gone.
    Closed,
}

/// An open connection.
#[derive(Debug)]
pub struct Link {
    /// Outbound text frames.
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Inbound events, in arrival order.
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections to a remote peer.
pub trait Connector: Send + Sync + 'static {
    /// Opens a connection to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the connection cannot be
    /// established.
    fn open(&self, address: &str) -> impl Future<Output = Result<Link, BridgeError>> + Send;
}
