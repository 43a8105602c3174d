//! In-memory host application.
//!
//! [`MemoryHost`] keeps created documents, settings and notifications in
//! process memory. It validates documents the way a real host would reject
//! obviously broken data, so command failure paths can be exercised end to
//! end without a running host application.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::RwLock;

use super::{EntityKind, Host, HostDescriptor, HostError, Identity, NoticeLevel};

/// A document stored by [`MemoryHost`].
#[derive(Debug, Clone)]
pub struct EntityRecord {
    /// Generated document id.
    pub id: String,
    /// Document kind.
    pub kind: EntityKind,
    /// The data the document was created from.
    pub data: Value,
}

/// Host application backed by process memory.
#[derive(Debug)]
pub struct MemoryHost {
    descriptor: HostDescriptor,
    entities: RwLock<Vec<EntityRecord>>,
    settings: RwLock<HashMap<String, Value>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl MemoryHost {
    /// Creates an empty host identified by `descriptor`.
    #[must_use]
    pub fn new(descriptor: HostDescriptor) -> Self {
        Self {
            descriptor,
            entities: RwLock::new(Vec::new()),
            settings: RwLock::new(HashMap::new()),
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Returns all stored documents of `kind`, in creation order.
    pub async fn entities(&self, kind: EntityKind) -> Vec<EntityRecord> {
        self.entities
            .read()
            .await
            .iter()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the total number of stored documents.
    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    /// Returns `true` if no document has been created.
    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    /// Returns every notification shown so far.
    #[must_use]
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Host for MemoryHost {
    fn descriptor(&self) -> HostDescriptor {
        self.descriptor.clone()
    }

    async fn create_entity(&self, kind: EntityKind, data: Value) -> Result<Identity, HostError> {
        let name = validate(kind, &data)?;
        let id = uuid::Uuid::new_v4().simple().to_string();

        self.entities.write().await.push(EntityRecord {
            id: id.clone(),
            kind,
            data,
        });

        tracing::debug!(%kind, %id, name = %name, "document created");
        Ok(Identity { id, name })
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(target: "notice", "{message}"),
            NoticeLevel::Warning => tracing::warn!(target: "notice", "{message}"),
            NoticeLevel::Error => tracing::error!(target: "notice", "{message}"),
        }
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    async fn get_config(&self, key: &str) -> Option<Value> {
        self.settings.read().await.get(key).cloned()
    }

    async fn set_config(&self, key: &str, value: Value) -> Result<(), HostError> {
        if value.is_null() {
            return Err(HostError::Rejected(format!(
                "setting `{key}` cannot be null"
            )));
        }
        self.settings.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Checks the fields every document needs and returns its name.
fn validate(kind: EntityKind, data: &Value) -> Result<String, HostError> {
    let name = data
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| HostError::InvalidData(format!("{kind} requires a name")))?;
    if name.trim().is_empty() {
        return Err(HostError::InvalidData(format!(
            "{kind} name must not be empty"
        )));
    }

    if kind == EntityKind::Scene {
        for dimension in ["width", "height"] {
            let value = data.get(dimension).and_then(Value::as_u64).unwrap_or(0);
            if value == 0 {
                return Err(HostError::InvalidData(format!(
                    "scene {dimension} must be positive"
                )));
            }
        }
    }

    Ok(name.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_host() -> MemoryHost {
        MemoryHost::new(HostDescriptor {
            world: "test-world".to_string(),
            system: "dnd5e".to_string(),
            version: "12.331".to_string(),
        })
    }

    #[tokio::test]
    async fn create_entity_stores_record() {
        let host = make_host();
        let result = host
            .create_entity(EntityKind::Journal, json!({"name": "Lore", "content": ""}))
            .await;
        let Ok(identity) = result else {
            panic!("journal creation failed");
        };
        assert_eq!(identity.name, "Lore");

        let journals = host.entities(EntityKind::Journal).await;
        assert_eq!(journals.len(), 1);
        assert_eq!(journals.first().map(|r| r.id.as_str()), Some(identity.id.as_str()));
        assert!(host.entities(EntityKind::Npc).await.is_empty());
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let host = make_host();
        let a = host.create_entity(EntityKind::Npc, json!({"name": "A"})).await;
        let b = host.create_entity(EntityKind::Npc, json!({"name": "A"})).await;
        let (Ok(a), Ok(b)) = (a, b) else {
            panic!("creation failed");
        };
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let host = make_host();
        let result = host.create_entity(EntityKind::Npc, json!({"name": "  "})).await;
        assert!(matches!(result, Err(HostError::InvalidData(_))));
        assert!(host.is_empty().await);
    }

    #[tokio::test]
    async fn zero_sized_scene_is_rejected() {
        let host = make_host();
        let result = host
            .create_entity(
                EntityKind::Scene,
                json!({"name": "Void", "width": 0, "height": 2000}),
            )
            .await;
        let Err(HostError::InvalidData(message)) = result else {
            panic!("expected invalid data");
        };
        assert!(message.contains("width"));
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let host = make_host();
        assert!(host.get_config("autoConnect").await.is_none());
        assert!(host.set_config("autoConnect", json!(false)).await.is_ok());
        assert_eq!(host.get_config("autoConnect").await, Some(json!(false)));
        assert!(host.set_config("autoConnect", Value::Null).await.is_err());
    }

    #[test]
    fn notify_records_notice() {
        let host = make_host();
        host.notify(NoticeLevel::Warning, "careful");
        assert_eq!(
            host.notices(),
            vec![(NoticeLevel::Warning, "careful".to_string())]
        );
    }
}
