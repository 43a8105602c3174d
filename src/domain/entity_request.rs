//! Loosely shaped creation requests sent by the remote controller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Ability data keyed by short name (`str`, `dex`, ...).
///
/// Each entry is kept exactly as sent, so system-specific fields such as
/// `proficient` reach the host untouched.
pub type Abilities = Map<String, Value>;

/// Input to the entity factory.
///
/// Every field is optional. A missing field falls back to the documented
/// default for the entity being built; a present field is used as given,
/// even when it is empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRequest {
    /// Display name.
    pub name: Option<String>,
    /// Actor subtype (NPCs only).
    #[serde(rename = "type")]
    pub actor_type: Option<String>,
    /// Portrait image path (NPCs only).
    pub img: Option<String>,
    /// Ability scores (NPCs only). Replaces the default set as a whole.
    pub abilities: Option<Abilities>,
    /// Armour class (NPCs only). Any JSON number.
    pub ac: Option<Number>,
    /// Hit points, used for both current and maximum (NPCs only). Any JSON
    /// number.
    pub hp: Option<Number>,
    /// Biography text (NPCs only).
    pub description: Option<String>,
    /// Body text (journals only).
    pub content: Option<String>,
    /// Width in pixels (scenes only).
    pub width: Option<u32>,
    /// Height in pixels (scenes only).
    pub height: Option<u32>,
}

impl EntityRequest {
    /// Creates a request that only sets a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
