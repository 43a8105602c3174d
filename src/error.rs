//! Bridge error types.
//!
//! [`BridgeError`] is the central error type. Any error raised while
//! handling a command is turned into an `error` envelope with
//! [`BridgeError::to_envelope`]; none of them is fatal to the process.
//! [`DecodeError`] covers inbound frames that never become a command.

use crate::host::HostError;
use crate::ws::messages::Envelope;

/// Errors surfaced by the connection manager and command handlers.
///
/// | Variant          | Handling                                      |
/// |------------------|-----------------------------------------------|
/// | `NotConnected`   | reported to the caller of `send`              |
/// | `Transport`      | logged; the reconnect loop retries            |
/// | `Host`           | replied to the peer as an `error` envelope    |
/// | `Encode`         | replied to the peer as an `error` envelope    |
/// | `Config`         | logged; the documented default is used        |
/// | `ManagerStopped` | reported to the caller                        |
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A send was attempted while the connection is not open.
    #[error("not connected")]
    NotConnected,

    /// The transport could not be opened or failed while in use.
    #[error("transport error: {0}")]
    Transport(String),

    /// The host application rejected an operation.
    #[error("{0}")]
    Host(#[from] HostError),

    /// A value could not be encoded to JSON.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A setting holds a value of the wrong shape.
    #[error("invalid setting `{key}`: {reason}")]
    Config {
        /// Settings key.
        key: String,
        /// What was wrong with the stored value.
        reason: String,
    },

    /// The connection manager task is no longer running.
    #[error("connection manager stopped")]
    ManagerStopped,
}

impl BridgeError {
    /// Returns `true` if the reconnect loop is expected to recover from
    /// this error without intervention.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Transport(_))
    }

    /// Converts the error into the `error` envelope sent to the peer.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope::error(self.to_string())
    }
}

/// Reasons an inbound frame could not be turned into a command.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not a JSON envelope with a `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope names a command this bridge does not handle.
    #[error("unknown command type `{0}`")]
    UnknownType(String),

    /// The command is known but its payload has the wrong shape.
    #[error("invalid payload for `{command}`: {source}")]
    InvalidPayload {
        /// Wire name of the command.
        command: &'static str,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}
