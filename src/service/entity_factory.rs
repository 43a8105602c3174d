//! Entity factory: builds host payloads and creates documents.
//!
//! The `build_*` functions are pure and apply the defaults below field by
//! field. The `create_*` functions hand the payload to the host and return
//! its [`Identity`] unchanged; host failures are not caught here.
//!
//! | Entity  | Field       | Default                         |
//! |---------|-------------|---------------------------------|
//! | NPC     | name        | `Unnamed NPC`                   |
//! | NPC     | type        | `npc`                           |
//! | NPC     | img         | `icons/svg/mystery-man.svg`     |
//! | NPC     | abilities   | str/dex/con/int/wis/cha = 10    |
//! | NPC     | ac          | 10                              |
//! | NPC     | hp          | 10 / 10                         |
//! | NPC     | biography   | empty                           |
//! | Journal | name        | `Unnamed Entry`                 |
//! | Journal | content     | empty                           |
//! | Scene   | name        | `New Scene`                     |
//! | Scene   | width       | 2000                            |
//! | Scene   | height      | 2000                            |

use serde::Serialize;
use serde_json::{Number, json};

use crate::domain::entity_payload::{
    HitPoints, NpcAttributes, NpcDetails, NpcSystem, TokenData, ValueField,
};
use crate::domain::entity_request::Abilities;
use crate::domain::{EntityRequest, JournalPayload, NpcPayload, ScenePayload};
use crate::error::BridgeError;
use crate::host::{EntityKind, Host, Identity, NoticeLevel};

/// Default NPC name.
pub const DEFAULT_NPC_NAME: &str = "Unnamed NPC";
/// Default actor subtype.
pub const DEFAULT_NPC_TYPE: &str = "npc";
/// Default NPC portrait.
pub const DEFAULT_NPC_IMG: &str = "icons/svg/mystery-man.svg";
/// Default token label when the request carries no name.
pub const DEFAULT_TOKEN_NAME: &str = "NPC";
/// Default value of every ability score.
pub const DEFAULT_ABILITY_SCORE: i64 = 10;
/// Default armour class.
pub const DEFAULT_AC: i64 = 10;
/// Default hit points.
pub const DEFAULT_HP: i64 = 10;
/// Default journal entry name.
pub const DEFAULT_JOURNAL_NAME: &str = "Unnamed Entry";
/// Default scene name.
pub const DEFAULT_SCENE_NAME: &str = "New Scene";
/// Default scene width and height in pixels.
pub const DEFAULT_SCENE_SIZE: u32 = 2000;

const ABILITY_KEYS: [&str; 6] = ["str", "dex", "con", "int", "wis", "cha"];

/// Returns the six standard abilities at the default score.
#[must_use]
pub fn default_abilities() -> Abilities {
    ABILITY_KEYS
        .iter()
        .map(|key| ((*key).to_string(), json!({ "value": DEFAULT_ABILITY_SCORE })))
        .collect()
}

/// Builds actor data for an NPC.
#[must_use]
pub fn build_npc_request(request: &EntityRequest) -> NpcPayload {
    let hp = request.hp.clone().unwrap_or_else(|| Number::from(DEFAULT_HP));
    NpcPayload {
        name: or_default(request.name.as_deref(), DEFAULT_NPC_NAME),
        actor_type: or_default(request.actor_type.as_deref(), DEFAULT_NPC_TYPE),
        img: or_default(request.img.as_deref(), DEFAULT_NPC_IMG),
        system: NpcSystem {
            abilities: request.abilities.clone().unwrap_or_else(default_abilities),
            attributes: NpcAttributes {
                ac: ValueField {
                    value: request.ac.clone().unwrap_or_else(|| Number::from(DEFAULT_AC)),
                },
                hp: HitPoints {
                    value: hp.clone(),
                    max: hp,
                },
            },
            details: NpcDetails {
                biography: ValueField {
                    value: request.description.clone().unwrap_or_default(),
                },
            },
        },
        token: TokenData {
            name: or_default(request.name.as_deref(), DEFAULT_TOKEN_NAME),
        },
    }
}

/// Builds journal entry data.
#[must_use]
pub fn build_journal_request(request: &EntityRequest) -> JournalPayload {
    JournalPayload {
        name: or_default(request.name.as_deref(), DEFAULT_JOURNAL_NAME),
        content: request.content.clone().unwrap_or_default(),
    }
}

/// Builds scene data.
#[must_use]
pub fn build_scene_request(request: &EntityRequest) -> ScenePayload {
    ScenePayload {
        name: or_default(request.name.as_deref(), DEFAULT_SCENE_NAME),
        width: request.width.unwrap_or(DEFAULT_SCENE_SIZE),
        height: request.height.unwrap_or(DEFAULT_SCENE_SIZE),
    }
}

/// Creates an NPC and notifies the user.
///
/// # Errors
///
/// Returns a [`BridgeError`] if the payload cannot be encoded or the host
/// rejects it.
pub async fn create_npc<H: Host>(
    host: &H,
    request: &EntityRequest,
) -> Result<Identity, BridgeError> {
    let identity = create(host, EntityKind::Npc, &build_npc_request(request)).await?;
    host.notify(NoticeLevel::Info, &format!("NPC created: {}", identity.name));
    Ok(identity)
}

/// Creates a journal entry and notifies the user.
///
/// # Errors
///
/// Returns a [`BridgeError`] if the payload cannot be encoded or the host
/// rejects it.
pub async fn create_journal<H: Host>(
    host: &H,
    request: &EntityRequest,
) -> Result<Identity, BridgeError> {
    let identity = create(host, EntityKind::Journal, &build_journal_request(request)).await?;
    host.notify(
        NoticeLevel::Info,
        &format!("Journal created: {}", identity.name),
    );
    Ok(identity)
}

/// Creates a scene.
///
/// # Errors
///
/// Returns a [`BridgeError`] if the payload cannot be encoded or the host
/// rejects it.
pub async fn create_scene<H: Host>(
    host: &H,
    request: &EntityRequest,
) -> Result<Identity, BridgeError> {
    create(host, EntityKind::Scene, &build_scene_request(request)).await
}

async fn create<H: Host, P: Serialize>(
    host: &H,
    kind: EntityKind,
    payload: &P,
) -> Result<Identity, BridgeError> {
    let data = serde_json::to_value(payload)?;
    let identity = host.create_entity(kind, data).await?;
    tracing::info!(%kind, id = %identity.id, name = %identity.name, "entity created");
    Ok(identity)
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}
