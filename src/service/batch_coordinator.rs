//! Batch coordinator: runs the entity factory over a [`BatchRequest`].
//!
//! Categories are processed in the order npcs, journals, scenes, and the
//! elements of each category strictly one after another. A failing element
//! is recorded in place and the remaining elements still run.

use crate::domain::{BatchEntry, BatchOutcome, BatchRequest, BatchResults, EntityRequest};
use crate::error::BridgeError;
use crate::host::{Host, Identity};

use super::entity_factory;

/// Processes every category present in `request`.
pub async fn import<H: Host>(host: &H, request: &BatchRequest) -> BatchResults {
    let npcs = match &request.npcs {
        Some(entries) => Some(run_category(host, "npcs", entries, Category::Npc).await),
        None => None,
    };
    let journals = match &request.journals {
        Some(entries) => Some(run_category(host, "journals", entries, Category::Journal).await),
        None => None,
    };
    let scenes = match &request.scenes {
        Some(entries) => Some(run_category(host, "scenes", entries, Category::Scene).await),
        None => None,
    };

    let results = BatchResults {
        npcs,
        journals,
        scenes,
    };
    tracing::info!(failures = results.failures(), "batch import finished");
    results
}

#[derive(Debug, Clone, Copy)]
enum Category {
    Npc,
    Journal,
    Scene,
}

impl Category {
    async fn create<H: Host>(
        self,
        host: &H,
        request: &EntityRequest,
    ) -> Result<Identity, BridgeError> {
        match self {
            Self::Npc => entity_factory::create_npc(host, request).await,
            Self::Journal => entity_factory::create_journal(host, request).await,
            Self::Scene => entity_factory::create_scene(host, request).await,
        }
    }
}

async fn run_category<H: Host>(
    host: &H,
    label: &'static str,
    entries: &[BatchEntry],
    category: Category,
) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let result = match &entry.0 {
            Ok(request) => category.create(host, request).await.map_err(|e| e.to_string()),
            Err(decode_error) => Err(decode_error.clone()),
        };
        match result {
            Ok(identity) => outcomes.push(BatchOutcome::Created(identity)),
            Err(error) => {
                tracing::warn!(category = label, index, %error, "batch item failed");
                outcomes.push(BatchOutcome::Failed { index, error });
            }
        }
    }
    outcomes
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::host::{EntityKind, HostDescriptor, MemoryHost};
    use serde_json::json;

    fn make_host() -> MemoryHost {
        MemoryHost::new(HostDescriptor {
            world: "w".to_string(),
            system: "dnd5e".to_string(),
            version: "12".to_string(),
        })
    }

    fn decode(value: serde_json::Value) -> BatchRequest {
        let Ok(request) = serde_json::from_value(value) else {
            panic!("invalid batch request");
        };
        request
    }

    fn names(outcomes: Option<&Vec<BatchOutcome>>) -> Vec<String> {
        outcomes
            .into_iter()
            .flatten()
            .filter_map(BatchOutcome::identity)
            .map(|identity| identity.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn npcs_are_created_in_input_order() {
        let host = make_host();
        let request = decode(json!({"npcs": [{"name": "A"}, {"name": "B"}]}));

        let results = import(&host, &request).await;

        assert_eq!(names(results.npcs.as_ref()), vec!["A", "B"]);
        assert!(results.journals.is_none());
        assert!(results.scenes.is_none());
        assert_eq!(host.entities(EntityKind::Npc).await.len(), 2);
    }

    #[tokio::test]
    async fn failed_item_does_not_abort_batch() {
        let host = make_host();
        let request = decode(json!({
            "npcs": [{"name": "A"}, {"name": ""}, {"name": "C"}],
            "journals": [{"name": "Log"}]
        }));

        let results = import(&host, &request).await;

        assert_eq!(names(results.npcs.as_ref()), vec!["A", "C"]);
        assert_eq!(names(results.journals.as_ref()), vec!["Log"]);
        assert_eq!(results.failures(), 1);
        let failed = results.npcs.as_ref().and_then(|npcs| npcs.get(1));
        assert!(matches!(failed, Some(BatchOutcome::Failed { index: 1, .. })));
    }

    #[tokio::test]
    async fn malformed_item_is_reported_in_place() {
        let host = make_host();
        let request = decode(json!({"scenes": [{"width": "wide"}, {"name": "Keep"}]}));

        let results = import(&host, &request).await;

        let Some(scenes) = results.scenes else {
            panic!("scenes missing");
        };
        let Some(BatchOutcome::Failed { error, .. }) = scenes.first() else {
            panic!("expected failure first");
        };
        assert!(error.starts_with("invalid entry"));
        assert!(scenes.get(1).and_then(BatchOutcome::identity).is_some());
    }

    #[tokio::test]
    async fn empty_category_yields_empty_array() {
        let host = make_host();
        let request = decode(json!({"journals": []}));

        let results = import(&host, &request).await;

        let Ok(value) = serde_json::to_value(&results) else {
            panic!("encode failed");
        };
        assert_eq!(value, json!({"journals": []}));
    }

    #[tokio::test]
    async fn scenes_are_imported() {
        let host = make_host();
        let request = decode(json!({"scenes": [{}]}));

        let results = import(&host, &request).await;

        assert_eq!(names(results.scenes.as_ref()), vec!["New Scene"]);
    }
}
