//! Bridge assembly: wires the host, connection manager and dispatcher.
//!
//! [`Bridge::init`] is the initialization hook. It resolves settings
//! against the host, spawns the background tasks and, when auto-connect
//! is enabled, connects after the startup delay. The `create_*` and
//! [`Bridge::batch_import`] methods expose the same creation operations to
//! local callers, without going through the controller.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::domain::{BatchRequest, BatchResults, EntityRequest};
use crate::error::BridgeError;
use crate::host::{Host, Identity, NoticeLevel};
use crate::service::{batch_coordinator, entity_factory};
use crate::transport::Connector;
use crate::ws::connection::{ConnectionManager, ConnectionSettings, ConnectionState};
use crate::ws::dispatcher::Dispatcher;
use crate::ws::messages::Envelope;

/// Notification shown when the controller link comes up.
pub const CONNECTED_NOTICE: &str = "Connected to OpenClaw";

/// Notification shown when an established controller link goes down.
pub const DISCONNECTED_NOTICE: &str = "Disconnected from OpenClaw";

/// A running bridge.
#[derive(Debug)]
pub struct Bridge<H> {
    host: Arc<H>,
    connection: ConnectionManager,
    tasks: Vec<JoinHandle<()>>,
    startup: Option<JoinHandle<()>>,
}

impl<H: Host> Bridge<H> {
    /// Initializes the bridge on `host`, connecting through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encode`] if the handshake cannot be built
    /// from the host descriptor.
    pub async fn init<C: Connector>(
        host: Arc<H>,
        connector: C,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let config = config.resolve_settings(&*host).await;
        let handshake = Envelope::identify(&host.descriptor())?;
        tracing::info!(
            address = %config.server_address,
            auto_connect = config.auto_connect,
            "initializing bridge"
        );

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let settings = ConnectionSettings {
            default_address: config.server_address.clone(),
            reconnect: config.reconnect,
            handshake,
        };
        let (connection, manager) = ConnectionManager::spawn(connector, settings, inbound_tx);

        let dispatcher = Dispatcher::new(Arc::clone(&host));
        let worker = tokio::spawn(dispatcher.run(inbound_rx, connection.clone()));
        let relay = tokio::spawn(relay_status(Arc::clone(&host), connection.subscribe()));

        let startup = config.auto_connect.then(|| {
            let connection = connection.clone();
            let delay = config.startup_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = connection.connect(None).await {
                    tracing::warn!(error = %e, "automatic connect failed");
                }
            })
        });

        Ok(Self {
            host,
            connection,
            tasks: vec![manager, worker, relay],
            startup,
        })
    }

    /// Returns the connection manager handle.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Returns the host the bridge acts on.
    #[must_use]
    pub const fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Creates an NPC.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Host`] if the host rejects the document.
    pub async fn create_npc(&self, request: &EntityRequest) -> Result<Identity, BridgeError> {
        entity_factory::create_npc(&*self.host, request).await
    }

    /// Creates a journal entry.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Host`] if the host rejects the document.
    pub async fn create_journal(&self, request: &EntityRequest) -> Result<Identity, BridgeError> {
        entity_factory::create_journal(&*self.host, request).await
    }

    /// Creates a scene.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Host`] if the host rejects the document.
    pub async fn create_scene(&self, request: &EntityRequest) -> Result<Identity, BridgeError> {
        entity_factory::create_scene(&*self.host, request).await
    }

    /// Creates every entity in `request`.
    pub async fn batch_import(&self, request: &BatchRequest) -> BatchResults {
        batch_coordinator::import(&*self.host, request).await
    }

    /// Disconnects and waits for the background tasks to finish.
    pub async fn shutdown(self) {
        if let Some(startup) = self.startup {
            startup.abort();
        }
        self.connection.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "bridge task ended abnormally");
            }
        }
        tracing::info!("bridge stopped");
    }
}

/// Mirrors connection state changes into host notifications.
///
/// The state is observed through a `watch` channel, which only keeps the
/// latest value. Transitions that happen faster than this task runs are
/// merged: leaving `Connected` is reported whichever state is seen next,
/// but a drop repaired before the task wakes up (`Connected`,
/// `Disconnected`, `Connecting`, `Connected`) produces no notice at all.
/// Notices are informational; nothing else depends on them.
async fn relay_status<H: Host>(host: Arc<H>, mut state: watch::Receiver<ConnectionState>) {
    let mut previous = *state.borrow_and_update();
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        if current == previous {
            continue;
        }
        match (previous, current) {
            (_, ConnectionState::Connected) => host.notify(NoticeLevel::Info, CONNECTED_NOTICE),
            (ConnectionState::Connected, _) => host.notify(NoticeLevel::Warning, DISCONNECTED_NOTICE),
            _ => {}
        }
        previous = current;
    }
}
