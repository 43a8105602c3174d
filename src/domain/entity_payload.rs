//! Document data in the exact shape the host application expects.
//!
//! These types are produced by the entity factory and serialized to JSON
//! before being handed to [`crate::host::Host::create_entity`].

use serde::Serialize;
use serde_json::Number;

use super::entity_request::Abilities;

/// A `{ "value": ... }` wrapper, the host's convention for scalar fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueField<T> {
    /// Wrapped value.
    pub value: T,
}

/// Actor data for a non-player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcPayload {
    /// Actor name.
    pub name: String,
    /// Actor subtype.
    #[serde(rename = "type")]
    pub actor_type: String,
    /// Portrait image path.
    pub img: String,
    /// System-specific data.
    pub system: NpcSystem,
    /// Prototype token data.
    pub token: TokenData,
}

/// System-specific portion of [`NpcPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcSystem {
    /// Ability scores.
    pub abilities: Abilities,
    /// Combat attributes.
    pub attributes: NpcAttributes,
    /// Descriptive details.
    pub details: NpcDetails,
}

/// Combat attributes of an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcAttributes {
    /// Armour class.
    pub ac: ValueField<Number>,
    /// Hit points.
    pub hp: HitPoints,
}

/// Current and maximum hit points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitPoints {
    /// Current hit points.
    pub value: Number,
    /// Maximum hit points.
    pub max: Number,
}

/// Descriptive details of an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcDetails {
    /// Biography HTML.
    pub biography: ValueField<String>,
}

/// Prototype token settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    /// Token label.
    pub name: String,
}

/// Journal entry data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalPayload {
    /// Entry name.
    pub name: String,
    /// Entry body.
    pub content: String,
}

/// Scene data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenePayload {
    /// Scene name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}
