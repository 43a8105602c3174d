//! Host application capability interface.
//!
//! The bridge never talks to the host application directly. Everything it
//! needs (entity creation, user notifications, the settings store and the
//! identity used for the handshake) goes through the [`Host`] trait. The
//! in-memory [`MemoryHost`] backs the bundled binary and the test suite.

pub mod memory;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

pub use memory::MemoryHost;

/// Kind of document the host is asked to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A non-player character (an `Actor` document).
    Npc,
    /// A journal entry.
    Journal,
    /// A scene.
    Scene,
}

impl EntityKind {
    /// Returns the host's document class name for this kind.
    #[must_use]
    pub const fn document_name(self) -> &'static str {
        match self {
            Self::Npc => "Actor",
            Self::Journal => "JournalEntry",
            Self::Scene => "Scene",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_name())
    }
}

/// The `{id, name}` pair returned by the host for a created document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Host-assigned document id.
    pub id: String,
    /// Name the document was created with.
    pub name: String,
}

/// Deployment metadata sent in the `identify` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDescriptor {
    /// World (session) identifier.
    pub world: String,
    /// Game system identifier, e.g. `dnd5e`.
    pub system: String,
    /// Host application version.
    pub version: String,
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something degraded but recoverable.
    Warning,
    /// Something failed.
    Error,
}

/// Failures reported by the host application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The document data was rejected by validation.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The host refused the operation for another reason.
    #[error("{0}")]
    Rejected(String),
}

/// Capabilities the bridge consumes from the host application.
///
/// Implementations must be cheap to share: the bridge holds the host
/// behind an [`std::sync::Arc`] and calls it from several tasks.
pub trait Host: Send + Sync + 'static {
    /// Returns the metadata the remote peer uses to identify this session.
    fn descriptor(&self) -> HostDescriptor;

    /// Creates a document of the given kind from `data`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] describing why the data was rejected.
    fn create_entity(
        &self,
        kind: EntityKind,
        data: serde_json::Value,
    ) -> impl Future<Output = Result<Identity, HostError>> + Send;

    /// Shows a fire-and-forget notification to the user.
    fn notify(&self, level: NoticeLevel, message: &str);

    /// Reads a setting, returning `None` when it has never been set.
    fn get_config(&self, key: &str) -> impl Future<Output = Option<serde_json::Value>> + Send;

    /// Writes a setting.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the settings store refuses the value.
    fn set_config(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}
