//! Batch import request and aggregated results.

use serde::{Deserialize, Deserializer, Serialize};

use super::{EntityRequest, require_object};
use crate::host::Identity;

/// One element of a batch category.
///
/// Elements are decoded individually so that a malformed element becomes a
/// per-item failure instead of rejecting the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry(pub Result<EntityRequest, String>);

impl<'de> Deserialize<'de> for BatchEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self(
            require_object(value)
                .and_then(serde_json::from_value)
                .map_err(|e| format!("invalid entry: {e}")),
        ))
    }
}

impl From<EntityRequest> for BatchEntry {
    fn from(request: EntityRequest) -> Self {
        Self(Ok(request))
    }
}

/// Payload of the `batchImport` command.
///
/// A category that is absent is skipped entirely; a category that is
/// present but empty yields an empty result array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchRequest {
    /// NPCs to create.
    pub npcs: Option<Vec<BatchEntry>>,
    /// Journal entries to create.
    pub journals: Option<Vec<BatchEntry>>,
    /// Scenes to create.
    pub scenes: Option<Vec<BatchEntry>>,
}

/// Outcome of a single batch element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    /// The document was created.
    Created(Identity),
    /// The element failed; the rest of the batch still ran.
    Failed {
        /// Position of the element within its category.
        index: usize,
        /// Failure message.
        error: String,
    },
}

impl BatchOutcome {
    /// Returns the created identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Created(identity) => Some(identity),
            Self::Failed { .. } => None,
        }
    }
}

/// Per-category outcomes of a batch import, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResults {
    /// NPC outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npcs: Option<Vec<BatchOutcome>>,
    /// Journal outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journals: Option<Vec<BatchOutcome>>,
    /// Scene outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<BatchOutcome>>,
}

impl BatchResults {
    /// Returns the number of elements that failed across all categories.
    #[must_use]
    pub fn failures(&self) -> usize {
        [&self.npcs, &self.journals, &self.scenes]
            .into_iter()
            .flatten()
            .flatten()
            .filter(|outcome| matches!(outcome, BatchOutcome::Failed { .. }))
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_empty_categories_differ() {
        let Ok(req) = serde_json::from_value::<BatchRequest>(json!({"journals": []})) else {
            panic!("decode failed");
        };
        assert!(req.npcs.is_none());
        assert_eq!(req.journals, Some(Vec::new()));
    }

    #[test]
    fn malformed_entry_does_not_reject_batch() {
        let Ok(req) =
            serde_json::from_value::<BatchRequest>(json!({"npcs": [{"name": "A"}, {"hp": "x"}]}))
        else {
            panic!("decode failed");
        };
        let Some(npcs) = req.npcs else {
            panic!("npcs missing");
        };
        assert_eq!(npcs.len(), 2);
        assert!(npcs.first().is_some_and(|e| e.0.is_ok()));
        assert!(npcs.get(1).is_some_and(|e| e.0.is_err()));
    }

    #[test]
    fn positional_entry_is_a_failure() {
        let Ok(req) =
            serde_json::from_value::<BatchRequest>(json!({"scenes": [["Cave", 100, 100], {"name": "B"}]}))
        else {
            panic!("decode failed");
        };
        let Some(scenes) = req.scenes else {
            panic!("scenes missing");
        };
        let Some(BatchEntry(Err(reason))) = scenes.first() else {
            panic!("array entry accepted");
        };
        assert!(reason.starts_with("invalid entry: invalid type: sequence"));
        assert!(scenes.get(1).is_some_and(|e| e.0.is_ok()));
    }

    #[test]
    fn results_omit_absent_categories() {
        let results = BatchResults {
            npcs: Some(vec![BatchOutcome::Created(Identity {
                id: "abc".to_string(),
                name: "A".to_string(),
            })]),
            journals: Some(Vec::new()),
            scenes: None,
        };
        let Ok(value) = serde_json::to_value(&results) else {
            panic!("encode failed");
        };
        assert_eq!(
            value,
            json!({"npcs": [{"id": "abc", "name": "A"}], "journals": []})
        );
    }

    #[test]
    fn failures_are_counted() {
        let results = BatchResults {
            npcs: Some(vec![BatchOutcome::Failed {
                index: 0,
                error: "boom".to_string(),
            }]),
            journals: None,
            scenes: Some(vec![BatchOutcome::Failed {
                index: 3,
                error: "bad".to_string(),
            }]),
        };
        assert_eq!(results.failures(), 2);
    }
}
