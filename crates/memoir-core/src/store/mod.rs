//! In-process memory store.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{MemoirError, MemoirResult};
use crate::traits::{ApplyReport, MemoryStore};
use crate::types::{MemoryEvent, MemoryItem, ReconciliationEntry};

/// Insertion-ordered memory store held in memory.
///
/// Can be loaded from and saved to a JSON array of `{"id", "text"}` objects,
/// which is the snapshot format used by the reconciliation prompt.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: RwLock<Vec<MemoryItem>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given items.
    pub fn from_items(items: Vec<MemoryItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Load a store from a JSON file. A missing file yields an empty store.
    pub async fn load_json(path: impl AsRef<Path>) -> MemoirResult<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!(path = %path.display(), "Memory file not found, starting empty");
            return Ok(Self::new());
        }

        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let items: Vec<MemoryItem> = serde_json::from_str(&content)
            .map_err(|e| MemoirError::parse(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_items(items))
    }

    /// Write the current contents to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> MemoirResult<()> {
        let content = {
            let items = self.items.read().await;
            serde_json::to_string_pretty(&*items)?
        };
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Look up a memory by id.
    pub async fn get(&self, id: &str) -> Option<MemoryItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn snapshot(&self) -> MemoirResult<Vec<MemoryItem>> {
        Ok(self.items.read().await.clone())
    }

    async fn apply(&self, entries: &[ReconciliationEntry]) -> MemoirResult<ApplyReport> {
        let mut items = self.items.write().await;
        let mut report = ApplyReport::default();

        for entry in entries {
            let position = items.iter().position(|item| item.id == entry.id);
            match (entry.event, position) {
                (MemoryEvent::Add, None) => {
                    items.push(MemoryItem::new(entry.id.clone(), entry.text.clone()));
                    report.added += 1;
                }
                (MemoryEvent::Update, Some(idx)) => {
                    items[idx].text = entry.text.clone();
                    report.updated += 1;
                }
                (MemoryEvent::Delete, Some(idx)) => {
                    items.remove(idx);
                    report.deleted += 1;
                }
                (MemoryEvent::None, _) => report.unchanged += 1,
                (event, _) => {
                    tracing::warn!(id = %entry.id, %event, "Skipping entry that does not match store contents");
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(?report, "Applied reconciliation entries");
        Ok(report)
    }
}
