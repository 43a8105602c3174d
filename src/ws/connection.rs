//! Connection manager: lifecycle state machine for the controller link.
//!
//! A single task owns the transport [`Link`] and the [`ConnectionState`].
//! Everything else talks to it through a cloneable [`ConnectionManager`]
//! handle, which sends control messages over an `mpsc` channel and waits
//! for a `oneshot` acknowledgement. The state is published on a `watch`
//! channel so it can be read without going through the task.
//!
//! ```text
//!              connect()                open ok
//! Disconnected ─────────► Connecting ─────────────► Connected
//!      ▲    ▲                 │ open failed             │ closed
//!      │    └─────────────────┤◄────────────────────────┘
//!      │     retry timer      │ schedule one retry
//!      └──────────────────────┘
//! ```

use std::fmt;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};

use super::messages::Envelope;
use super::reconnect::ReconnectPolicy;
use crate::error::BridgeError;
use crate::transport::{Connector, Link, TransportEvent};

const CONTROL_CAPACITY: usize = 64;

/// Lifecycle state of the controller connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and no attempt in progress.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The link is open and the handshake has been sent.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Static settings of a connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Address used when `connect` is called without one.
    pub default_address: String,
    /// Delay policy between reconnect attempts.
    pub reconnect: ReconnectPolicy,
    /// Envelope sent first on every new connection.
    pub handshake: Envelope,
}

#[derive(Debug)]
enum Control {
    Connect(Option<String>, oneshot::Sender<()>),
    Disconnect(oneshot::Sender<()>),
    Send(Envelope, oneshot::Sender<Result<(), BridgeError>>),
    Shutdown,
}

/// Handle to the connection manager task.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    control: mpsc::Sender<Control>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionManager {
    /// Spawns the manager task in the `Disconnected` state.
    ///
    /// Text frames received on the link are forwarded, in order, to
    /// `inbound`.
    #[must_use]
    pub fn spawn<C: Connector>(
        connector: C,
        settings: ConnectionSettings,
        inbound: mpsc::UnboundedSender<String>,
    ) -> (Self, JoinHandle<()>) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let actor = Actor {
            connector: Arc::new(connector),
            address: settings.default_address.clone(),
            settings,
            control: control_rx,
            inbound,
            state: state_tx,
            link: None,
            opening: None,
            retry: None,
            failures: 0,
        };
        let task = tokio::spawn(actor.run());

        (
            Self {
                control: control_tx,
                state: state_rx,
            },
            task,
        )
    }

    /// Starts connecting to `address`, or to the default address.
    ///
    /// Does nothing unless the manager is `Disconnected`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ManagerStopped`] if the task has exited.
    pub async fn connect(&self, address: Option<String>) -> Result<(), BridgeError> {
        self.request(|ack| Control::Connect(address, ack)).await
    }

    /// Closes the link, aborts any attempt in progress and cancels a
    /// pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ManagerStopped`] if the task has exited.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.request(Control::Disconnect).await
    }

    /// Sends `envelope` to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] unless the manager is
    /// `Connected`; the envelope is dropped, never queued.
    pub async fn send(&self, envelope: Envelope) -> Result<(), BridgeError> {
        self.request(|ack| Control::Send(envelope, ack)).await?
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the manager reaches `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ManagerStopped`] if the task exits first.
    pub async fn wait_for(&self, target: ConnectionState) -> Result<(), BridgeError> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| BridgeError::ManagerStopped)
    }

    /// Disconnects and stops the manager task.
    pub async fn shutdown(&self) {
        let _ = self.control.send(Control::Shutdown).await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Control,
    ) -> Result<T, BridgeError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.control
            .send(make(ack_tx))
            .await
            .map_err(|_| BridgeError::ManagerStopped)?;
        ack_rx.await.map_err(|_| BridgeError::ManagerStopped)
    }
}

struct Actor<C> {
    connector: Arc<C>,
    settings: ConnectionSettings,
    address: String,
    control: mpsc::Receiver<Control>,
    inbound: mpsc::UnboundedSender<String>,
    state: watch::Sender<ConnectionState>,
    link: Option<Link>,
    opening: Option<JoinHandle<Result<Link, BridgeError>>>,
    retry: Option<Pin<Box<Sleep>>>,
    failures: u32,
}

impl<C: Connector> Actor<C> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                control = self.control.recv() => match control {
                    Some(Control::Shutdown) | None => break,
                    Some(control) => self.on_control(control),
                },
                opened = join_opening(&mut self.opening) => {
                    self.opening = None;
                    self.on_opened(opened);
                }
                event = next_event(&mut self.link) => self.on_event(event),
                () = wait_retry(&mut self.retry) => {
                    self.retry = None;
                    if self.current() == ConnectionState::Disconnected {
                        self.begin_connect();
                    }
                }
            }
        }

        self.close();
        tracing::debug!("connection manager stopped");
    }

    fn on_control(&mut self, control: Control) {
        match control {
            Control::Connect(address, ack) => {
                if self.current() == ConnectionState::Disconnected {
                    self.address = address.unwrap_or_else(|| self.settings.default_address.clone());
                    self.retry = None;
                    self.failures = 0;
                    self.begin_connect();
                } else {
                    tracing::debug!(state = %self.current(), "connect ignored");
                }
                let _ = ack.send(());
            }
            Control::Disconnect(ack) => {
                self.close();
                let _ = ack.send(());
            }
            Control::Send(envelope, ack) => {
                let _ = ack.send(self.transmit(&envelope));
            }
            Control::Shutdown => {}
        }
    }

    fn on_opened(&mut self, opened: Result<Link, BridgeError>) {
        match opened {
            Ok(link) => {
                match self.settings.handshake.encode() {
                    Ok(text) => {
                        if link.outgoing.send(text).is_err() {
                            tracing::warn!(address = %self.address, "link closed before handshake");
                            self.connection_lost();
                            return;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "handshake could not be encoded"),
                }
                self.link = Some(link);
                self.failures = 0;
                self.set_state(ConnectionState::Connected);
                tracing::info!(address = %self.address, "connected");
            }
            Err(e) => {
                tracing::warn!(address = %self.address, error = %e, "connection attempt failed");
                self.connection_lost();
            }
        }
    }

    fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => {
                if self.inbound.send(text).is_err() {
                    tracing::debug!("no dispatcher; inbound frame dropped");
                }
            }
            TransportEvent::Error(reason) => {
                tracing::warn!(address = %self.address, %reason, "transport error");
            }
            TransportEvent::Closed => {
                self.link = None;
                tracing::info!(address = %self.address, "connection closed");
                self.connection_lost();
            }
        }
    }

    fn transmit(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        let Some(link) = &self.link else {
            tracing::debug!(kind = %envelope.kind, "send rejected: not connected");
            return Err(BridgeError::NotConnected);
        };
        let text = envelope.encode()?;
        link.outgoing
            .send(text)
            .map_err(|_| BridgeError::Transport("link closed".to_string()))
    }

    fn begin_connect(&mut self) {
        self.set_state(ConnectionState::Connecting);
        tracing::info!(address = %self.address, attempt = self.failures.saturating_add(1), "connecting");

        let connector = Arc::clone(&self.connector);
        let address = self.address.clone();
        self.opening = Some(tokio::spawn(async move { connector.open(&address).await }));
    }

    fn connection_lost(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        let delay = self.settings.reconnect.delay(self.failures);
        self.failures = self.failures.saturating_add(1);
        tracing::info!(address = %self.address, ?delay, "reconnect scheduled");
        self.retry = Some(Box::pin(sleep(delay)));
    }

    /// Drops the link and any attempt or retry in flight.
    fn close(&mut self) {
        self.retry = None;
        if let Some(opening) = self.opening.take() {
            opening.abort();
        }
        if self.link.take().is_some() {
            tracing::info!(address = %self.address, "disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "connection state changed");
        }
    }
}

async fn join_opening(
    opening: &mut Option<JoinHandle<Result<Link, BridgeError>>>,
) -> Result<Link, BridgeError> {
    match opening {
        Some(handle) => handle
            .await
            .unwrap_or_else(|e| Err(BridgeError::Transport(e.to_string()))),
        None => pending().await,
    }
}

async fn next_event(link: &mut Option<Link>) -> TransportEvent {
    match link {
        Some(link) => link.incoming.recv().await.unwrap_or(TransportEvent::Closed),
        None => pending().await,
    }
}

async fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::{MemoryConnector, MemoryPeer};
    use crate::ws::messages::kind;

    struct Fixture {
        manager: ConnectionManager,
        connector: MemoryConnector,
        peers: mpsc::UnboundedReceiver<MemoryPeer>,
        inbound: mpsc::UnboundedReceiver<String>,
    }

    fn fixture(reconnect: ReconnectPolicy) -> Fixture {
        let (connector, peers) = MemoryConnector::channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let settings = ConnectionSettings {
            default_address: "mem://controller".to_string(),
            reconnect,
            handshake: Envelope::bare(kind::IDENTIFY),
        };
        let (manager, _task) = ConnectionManager::spawn(connector.clone(), settings, inbound_tx);
        Fixture {
            manager,
            connector,
            peers,
            inbound,
        }
    }

    async fn connected(fx: &mut Fixture) -> MemoryPeer {
        assert!(fx.manager.connect(None).await.is_ok());
        let Some(peer) = fx.peers.recv().await else {
            panic!("no connection opened");
        };
        assert!(fx.manager.wait_for(ConnectionState::Connected).await.is_ok());
        peer
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let mut fx = fixture(ReconnectPolicy::default());
        let _peer = connected(&mut fx).await;

        assert!(fx.manager.connect(None).await.is_ok());
        assert!(fx.manager.connect(Some("mem://other".to_string())).await.is_ok());

        assert_eq!(fx.connector.attempts(), 1);
        assert_eq!(fx.manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn handshake_is_first_frame() {
        let mut fx = fixture(ReconnectPolicy::default());
        let mut peer = connected(&mut fx).await;

        assert!(fx.manager.send(Envelope::pong()).await.is_ok());

        let first = peer.recv_envelope().await;
        assert_eq!(first.map(|env| env.kind), Some("identify".to_string()));
        let second = peer.recv_envelope().await;
        assert_eq!(second.map(|env| env.kind), Some("pong".to_string()));
    }

    #[tokio::test]
    async fn explicit_address_is_used() {
        let mut fx = fixture(ReconnectPolicy::default());
        assert!(fx.manager.connect(Some("mem://elsewhere".to_string())).await.is_ok());
        let Some(peer) = fx.peers.recv().await else {
            panic!("no connection opened");
        };
        assert_eq!(peer.address, "mem://elsewhere");
    }

    #[tokio::test]
    async fn send_while_disconnected_is_rejected() {
        let fx = fixture(ReconnectPolicy::default());
        let result = fx.manager.send(Envelope::pong()).await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
        assert_eq!(fx.connector.attempts(), 0);
    }

    #[tokio::test]
    async fn inbound_frames_are_forwarded_in_order() {
        let mut fx = fixture(ReconnectPolicy::default());
        let peer = connected(&mut fx).await;

        for frame in ["one", "two", "three"] {
            assert!(peer.send_text(frame));
        }
        for expected in ["one", "two", "three"] {
            assert_eq!(fx.inbound.recv().await.as_deref(), Some(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn close_schedules_exactly_one_reconnect() {
        let mut fx = fixture(ReconnectPolicy::Fixed(Duration::from_secs(5)));
        let peer = connected(&mut fx).await;

        peer.close();
        assert!(fx.manager.wait_for(ConnectionState::Disconnected).await.is_ok());

        sleep(Duration::from_secs(4)).await;
        assert_eq!(fx.connector.attempts(), 1);

        sleep(Duration::from_secs(2)).await;
        assert!(fx.manager.wait_for(ConnectionState::Connected).await.is_ok());
        assert_eq!(fx.connector.attempts(), 2);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(fx.connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_alone_keeps_connection() {
        let mut fx = fixture(ReconnectPolicy::Fixed(Duration::from_secs(5)));
        let mut peer = connected(&mut fx).await;
        let _handshake = peer.recv_text().await;

        peer.report_error("frame too large");
        assert!(peer.send_text("after"));
        assert_eq!(fx.inbound.recv().await.as_deref(), Some("after"));
        assert_eq!(fx.manager.state(), ConnectionState::Connected);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(fx.manager.state(), ConnectionState::Connected);
        assert_eq!(fx.connector.attempts(), 1);
        assert!(fx.manager.send(Envelope::pong()).await.is_ok());
        assert_eq!(peer.recv_envelope().await, Some(Envelope::pong()));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let mut fx = fixture(ReconnectPolicy::Fixed(Duration::from_secs(5)));
        let peer = connected(&mut fx).await;

        peer.fail("connection reset");
        assert!(fx.manager.wait_for(ConnectionState::Disconnected).await.is_ok());
        assert!(fx.manager.disconnect().await.is_ok());

        sleep(Duration::from_secs(60)).await;
        assert_eq!(fx.connector.attempts(), 1);
        assert_eq!(fx.manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connections_keep_retrying() {
        let mut fx = fixture(ReconnectPolicy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(4),
        });
        fx.connector.set_refusing(true);
        assert!(fx.manager.connect(None).await.is_ok());

        // Attempts at t = 0, 1, 3, 7, 11.
        sleep(Duration::from_millis(11_500)).await;
        assert_eq!(fx.connector.attempts(), 5);
        assert_eq!(fx.manager.state(), ConnectionState::Disconnected);

        fx.connector.set_refusing(false);
        assert!(fx.manager.wait_for(ConnectionState::Connected).await.is_ok());
        assert!(fx.peers.recv().await.is_some());
    }

    #[tokio::test]
    async fn disconnect_closes_link() {
        let mut fx = fixture(ReconnectPolicy::default());
        let mut peer = connected(&mut fx).await;
        assert!(peer.recv_text().await.is_some());

        assert!(fx.manager.disconnect().await.is_ok());

        assert_eq!(fx.manager.state(), ConnectionState::Disconnected);
        assert!(peer.recv_text().await.is_none());
        assert!(matches!(
            fx.manager.send(Envelope::pong()).await,
            Err(BridgeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn shutdown_stops_task() {
        let fx = fixture(ReconnectPolicy::default());
        fx.manager.shutdown().await;
        let result = fx.manager.connect(None).await;
        assert!(matches!(result, Err(BridgeError::ManagerStopped)));
    }
}
