//! Memory item and reconciliation types.

use serde::{Deserialize, Serialize};

/// A previously stored memory, as presented to the reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Caller-assigned identifier. Treated as opaque.
    pub id: String,
    /// The memory content.
    pub text: String,
}

impl MemoryItem {
    /// Create a new memory item.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Decision for a single memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryEvent {
    #[serde(alias = "add", alias = "Add")]
    Add,
    #[serde(alias = "update", alias = "Update")]
    Update,
    #[serde(alias = "delete", alias = "Delete")]
    Delete,
    #[default]
    #[serde(alias = "none", alias = "None")]
    None,
}

impl MemoryEvent {
    /// Get the protocol spelling of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryEvent::Add => "ADD",
            MemoryEvent::Update => "UPDATE",
            MemoryEvent::Delete => "DELETE",
            MemoryEvent::None => "NONE",
        }
    }

    /// Whether this event must reference an id from the existing snapshot.
    pub fn references_existing(&self) -> bool {
        !matches!(self, MemoryEvent::Add)
    }
}

impl std::fmt::Display for MemoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation decision produced by the model.
///
/// On the wire the previous text of an updated memory is called
/// `old_memory`; `old_text` is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub id: String,
    pub text: String,
    pub event: MemoryEvent,
    #[serde(
        rename = "old_memory",
        alias = "old_text",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub old_text: Option<String>,
}

impl ReconciliationEntry {
    /// Create an ADD decision.
    pub fn add(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            event: MemoryEvent::Add,
            old_text: None,
        }
    }

    /// Create an UPDATE decision.
    pub fn update(
        id: impl Into<String>,
        text: impl Into<String>,
        old_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            event: MemoryEvent::Update,
            old_text: Some(old_text.into()),
        }
    }

    /// Create a DELETE decision.
    pub fn delete(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            event: MemoryEvent::Delete,
            old_text: None,
        }
    }

    /// Create a NONE decision.
    pub fn unchanged(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            event: MemoryEvent::None,
            old_text: None,
        }
    }
}

/// Facts extracted from a conversation, in order of first mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactExtractionResult {
    pub facts: Vec<String>,
}

impl FactExtractionResult {
    /// Create a result from a list of facts.
    pub fn new(facts: Vec<String>) -> Self {
        Self { facts }
    }

    /// The empty result every failure mode degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Serialize to the compact protocol form, e.g. `{"facts":["a"]}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"facts":[]}"#.to_string())
    }
}

/// Wire shape of a reconciliation response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    pub memory: Vec<ReconciliationEntry>,
}
