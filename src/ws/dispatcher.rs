//! Command dispatcher: turns inbound frames into replies.
//!
//! Frames are handled one at a time, in arrival order. Each command runs
//! in its own task that the worker awaits before taking the next frame, so
//! a handler that panics is reported to the peer like any other failure
//! and the worker keeps going.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::connection::ConnectionManager;
use super::messages::{Command, CommandResult, Envelope};
use crate::error::{BridgeError, DecodeError};
use crate::host::{Host, Identity};
use crate::service::{batch_coordinator, entity_factory};

/// Routes decoded commands to the entity factory and batch coordinator.
#[derive(Debug)]
pub struct Dispatcher<H> {
    host: Arc<H>,
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: Host> Dispatcher<H> {
    /// Creates a dispatcher acting on `host`.
    #[must_use]
    pub const fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    /// Handles one text frame and returns the reply to send, if any.
    ///
    /// Malformed frames and unknown command types produce no reply.
    pub async fn handle_frame(&self, frame: &str) -> Option<Envelope> {
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed frame");
                return None;
            }
        };

        let command = match Command::try_from(envelope) {
            Ok(command) => command,
            Err(DecodeError::UnknownType(kind)) => {
                tracing::warn!(%kind, "ignoring unknown command");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejecting command");
                return Some(Envelope::error(e.to_string()));
            }
        };

        let name = command.name();
        tracing::debug!(command = name, "dispatching");
        match self.execute(command).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(command = name, error = %e, "command failed");
                Some(e.to_envelope())
            }
        }
    }

    /// Runs a decoded command.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the host rejects a creation or the
    /// reply cannot be encoded. Per-item batch failures are reported inside
    /// the result instead.
    pub async fn execute(&self, command: Command) -> Result<Envelope, BridgeError> {
        let host = &*self.host;
        match command {
            Command::Ping => Ok(Envelope::pong()),
            Command::CreateNpc(request) => {
                created(entity_factory::create_npc(host, &request).await?)
            }
            Command::CreateJournal(request) => {
                created(entity_factory::create_journal(host, &request).await?)
            }
            Command::CreateScene(request) => {
                created(entity_factory::create_scene(host, &request).await?)
            }
            Command::BatchImport(request) => {
                let results = batch_coordinator::import(host, &request).await;
                Ok(Envelope::result(&CommandResult::batch(results))?)
            }
        }
    }

    /// Consumes inbound frames until the queue closes, sending every reply
    /// through `connection`.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<String>, connection: ConnectionManager) {
        while let Some(frame) = inbound.recv().await {
            let dispatcher = self.clone();
            let handled = tokio::spawn(async move { dispatcher.handle_frame(&frame).await }).await;

            let reply = match handled {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(error = %e, "command handler aborted");
                    Some(Envelope::error("command handler aborted"))
                }
            };

            if let Some(reply) = reply
                && let Err(e) = connection.send(reply).await
            {
                if e.is_transient() {
                    tracing::debug!(error = %e, "reply dropped, link is down");
                } else {
                    tracing::warn!(error = %e, "reply dropped");
                }
            }
        }
        tracing::debug!("dispatcher stopped");
    }
}

fn created(identity: Identity) -> Result<Envelope, BridgeError> {
    Ok(Envelope::result(&CommandResult::created(identity))?)
}
