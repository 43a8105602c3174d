//! In-process connector.
//!
//! Every successful [`MemoryConnector::open`] hands the far end of the
//! new link to whoever holds the peer receiver, as a [`MemoryPeer`]. Used
//! to embed the bridge without a network and to drive it from tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use super::{Connector, Link, TransportEvent};
use crate::error::BridgeError;
use crate::ws::messages::Envelope;

/// Connector whose connections terminate inside the process.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    attempts: Arc<AtomicUsize>,
    refusing: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// Creates a connector and the receiver on which accepted peers appear.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            attempts: Arc::new(AtomicUsize::new(0)),
            refusing: Arc::new(AtomicBool::new(false)),
        };
        (connector, accepted)
    }

    /// Returns how many times `open` has been called, refused or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Makes subsequent `open` calls fail (or succeed again).
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl Connector for MemoryConnector {
    async fn open(&self, address: &str) -> Result<Link, BridgeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refusing.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport(format!(
                "connection to {address} refused"
            )));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            address: address.to_string(),
            events: event_tx,
            frames: out_rx,
        };
        self.peers
            .send(peer)
            .map_err(|_| BridgeError::Transport(format!("no listener for {address}")))?;

        Ok(Link {
            outgoing: out_tx,
            incoming: event_rx,
        })
    }
}

/// The remote end of an in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Address the bridge asked for.
    pub address: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    frames: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Delivers a text frame to the bridge. Returns `false` if the bridge
    /// side of the link is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.events
            .send(TransportEvent::Message(text.into()))
            .is_ok()
    }

    /// Delivers an envelope to the bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded.
    pub fn send_envelope(&self, envelope: &Envelope) -> Result<bool, serde_json::Error> {
        Ok(self.send_text(envelope.encode()?))
    }

    /// Reports a transport error without closing the connection.
    pub fn report_error(&self, reason: &str) {
        let _ = self.events.send(TransportEvent::Error(reason.to_string()));
    }

    /// Reports a transport error followed by a close, as a socket would.
    pub fn fail(&self, reason: &str) {
        self.report_error(reason);
        self.close();
    }

    /// Closes the connection from the remote side.
    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Waits for the next frame sent by the bridge. `None` once the bridge
    /// has dropped the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Waits for the next frame and decodes it as an envelope.
    pub async fn recv_envelope(&mut self) -> Option<Envelope> {
        let text = self.recv_text().await?;
        Envelope::decode(&text).ok()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_hands_peer_to_listener() {
        let (connector, mut accepted) = MemoryConnector::channel();
        let Ok(mut link) = connector.open("mem://controller").await else {
            panic!("open failed");
        };
        let Some(mut peer) = accepted.recv().await else {
            panic!("no peer");
        };
        assert_eq!(peer.address, "mem://controller");

        assert!(link.outgoing.send("up".to_string()).is_ok());
        assert_eq!(peer.recv_text().await.as_deref(), Some("up"));

        assert!(peer.send_text("down"));
        assert_eq!(
            link.incoming.recv().await,
            Some(TransportEvent::Message("down".to_string()))
        );
    }

    #[tokio::test]
    async fn refusing_connector_counts_attempts() {
        let (connector, _accepted) = MemoryConnector::channel();
        connector.set_refusing(true);
        assert!(connector.open("mem://a").await.is_err());
        assert!(connector.open("mem://a").await.is_err());
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn fail_sends_error_then_closed() {
        let (connector, mut accepted) = MemoryConnector::channel();
        let Ok(mut link) = connector.open("mem://a").await else {
            panic!("open failed");
        };
        let Some(peer) = accepted.recv().await else {
            panic!("no peer");
        };
        peer.fail("reset");
        assert_eq!(
            link.incoming.recv().await,
            Some(TransportEvent::Error("reset".to_string()))
        );
        assert_eq!(link.incoming.recv().await, Some(TransportEvent::Closed));
    }
}
