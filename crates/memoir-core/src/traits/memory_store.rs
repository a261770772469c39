//! Storage collaborator trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoirResult;
use crate::types::{MemoryItem, ReconciliationEntry};

/// Counts of what a store did with a decision list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Entries the store could not apply (e.g. an UPDATE for an id that
    /// disappeared between snapshot and apply).
    pub skipped: usize,
}

impl ApplyReport {
    /// Number of entries that changed stored state.
    pub fn changed(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Applies reconciliation decisions to persistent memory.
///
/// ADD inserts under the entry id, UPDATE overwrites the text of an existing
/// id, DELETE removes it, NONE is a no-op.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Current contents, in insertion order.
    async fn snapshot(&self) -> MemoirResult<Vec<MemoryItem>>;

    /// Apply a validated decision list.
    async fn apply(&self, entries: &[ReconciliationEntry]) -> MemoirResult<ApplyReport>;
}
