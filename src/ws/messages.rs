//! Wire messages: the envelope, inbound commands and outbound results.
//!
//! Every frame is one JSON [`Envelope`]. Inbound envelopes are validated
//! into the closed [`Command`] set before anything acts on them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BatchRequest, BatchResults, EntityRequest, require_object};
use crate::error::DecodeError;
use crate::host::{HostDescriptor, Identity};

/// Wire names of the inbound commands.
pub mod kind {
    /// Liveness probe.
    pub const PING: &str = "ping";
    /// Create one NPC.
    pub const CREATE_NPC: &str = "createNPC";
    /// Create one journal entry.
    pub const CREATE_JOURNAL: &str = "createJournal";
    /// Create one scene.
    pub const CREATE_SCENE: &str = "createScene";
    /// Create several documents at once.
    pub const BATCH_IMPORT: &str = "batchImport";

    /// Handshake sent after every successful connect.
    pub const IDENTIFY: &str = "identify";
    /// Reply to `ping`.
    pub const PONG: &str = "pong";
    /// Successful command reply.
    pub const RESULT: &str = "result";
    /// Failed command reply.
    pub const ERROR: &str = "error";
}

/// The `{type, payload}` unit carried by every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub kind: String,
    /// Variant-specific payload; omitted on the wire when null.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Envelope {
    /// Creates an envelope without payload.
    #[must_use]
    pub fn bare(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            payload: Value::Null,
        }
    }

    /// Creates the `identify` handshake for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be encoded.
    pub fn identify(descriptor: &HostDescriptor) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind::IDENTIFY.to_string(),
            payload: serde_json::to_value(descriptor)?,
        })
    }

    /// Creates a `pong` reply.
    #[must_use]
    pub fn pong() -> Self {
        Self::bare(kind::PONG)
    }

    /// Creates a `result` reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be encoded.
    pub fn result(result: &CommandResult) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: kind::RESULT.to_string(),
            payload: serde_json::to_value(result)?,
        })
    }

    /// Creates an `error` reply carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: kind::ERROR.to_string(),
            payload: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if the frame is not a JSON object
    /// with a `type` field.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(frame)?;
        Ok(serde_json::from_value(require_object(value)?)?)
    }

    /// Encodes the envelope as a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inbound commands understood by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe.
    Ping,
    /// Create one NPC.
    CreateNpc(EntityRequest),
    /// Create one journal entry.
    CreateJournal(EntityRequest),
    /// Create one scene.
    CreateScene(EntityRequest),
    /// Create several documents.
    BatchImport(BatchRequest),
}

impl Command {
    /// Returns the wire name of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ping => kind::PING,
            Self::CreateNpc(_) => kind::CREATE_NPC,
            Self::CreateJournal(_) => kind::CREATE_JOURNAL,
            Self::CreateScene(_) => kind::CREATE_SCENE,
            Self::BatchImport(_) => kind::BATCH_IMPORT,
        }
    }
}

impl TryFrom<Envelope> for Command {
    type Error = DecodeError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind: name, payload } = envelope;
        match name.as_str() {
            kind::PING => Ok(Self::Ping),
            kind::CREATE_NPC => Ok(Self::CreateNpc(payload_as(kind::CREATE_NPC, payload)?)),
            kind::CREATE_JOURNAL => Ok(Self::CreateJournal(payload_as(
                kind::CREATE_JOURNAL,
                payload,
            )?)),
            kind::CREATE_SCENE => Ok(Self::CreateScene(payload_as(kind::CREATE_SCENE, payload)?)),
            kind::BATCH_IMPORT => Ok(Self::BatchImport(payload_as(kind::BATCH_IMPORT, payload)?)),
            _ => Err(DecodeError::UnknownType(name)),
        }
    }
}

/// Decodes a command payload; a missing payload is the empty request and
/// anything other than an object is rejected.
fn payload_as<T: DeserializeOwned + Default>(
    command: &'static str,
    payload: Value,
) -> Result<T, DecodeError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    require_object(payload)
        .and_then(serde_json::from_value)
        .map_err(|source| DecodeError::InvalidPayload { command, source })
}

/// Payload of a `result` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Always present.
    pub success: bool,
    /// Id of the created document (single-entity commands).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the created document (single-entity commands).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Aggregated outcomes (`batchImport`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BatchResults>,
    /// Human-readable remark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResult {
    /// Result of a single successful creation.
    #[must_use]
    pub fn created(identity: Identity) -> Self {
        Self {
            success: true,
            id: Some(identity.id),
            name: Some(identity.name),
            results: None,
            message: None,
        }
    }

    /// Result of a batch import. Partial failures are summarized in
    /// `message`.
    #[must_use]
    pub fn batch(results: BatchResults) -> Self {
        let failures = results.failures();
        let message = (failures > 0).then(|| format!("{failures} item(s) failed"));
        Self {
            success: true,
            id: None,
            name: None,
            results: Some(results),
            message,
        }
    }
}
