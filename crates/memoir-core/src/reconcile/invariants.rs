//! Identity invariants for reconciliation decisions.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{MemoryEvent, MemoryItem, ReconciliationEntry};

/// What the invariant pass removed or repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// UPDATE/DELETE/NONE entries whose id is not in the snapshot.
    pub unknown_id: usize,
    /// ADD entries whose id already exists in the snapshot.
    pub colliding_add: usize,
    /// ADD entries with a blank id or blank text.
    pub empty_add: usize,
    /// UPDATE entries with blank text.
    pub empty_update: usize,
    /// Entries repeating an id already decided earlier in the list.
    pub duplicate_id: usize,
    /// UPDATE entries whose text equals the stored text, turned into NONE.
    pub noop_update: usize,
    /// Entries whose `old_text` was stripped or filled in.
    pub repaired_old_text: usize,
}

impl FilterReport {
    /// Number of entries removed from the list.
    pub fn dropped(&self) -> usize {
        self.unknown_id + self.colliding_add + self.empty_add + self.empty_update + self.duplicate_id
    }
}

/// Enforce the identity invariants of a decision list against the snapshot
/// it was computed from.
///
/// - UPDATE, DELETE and NONE must reference an existing id.
/// - ADD must use a non-blank id absent from the snapshot and carry text.
/// - UPDATE must carry text.
/// - Each id is decided at most once; the first decision wins.
/// - `old_text` is present exactly on UPDATE entries. A missing one is
///   filled from the snapshot.
///
/// Order of the surviving entries is preserved.
pub fn enforce_id_invariant(
    entries: Vec<ReconciliationEntry>,
    old_memory: &[MemoryItem],
) -> (Vec<ReconciliationEntry>, FilterReport) {
    let existing: HashMap<&str, &str> = old_memory
        .iter()
        .map(|item| (item.id.as_str(), item.text.as_str()))
        .collect();

    let mut report = FilterReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(entries.len());

    for mut entry in entries {
        let stored = existing.get(entry.id.as_str()).copied();

        match (entry.event, stored) {
            (MemoryEvent::Add, Some(_)) => {
                tracing::warn!(id = %entry.id, "Dropping ADD that reuses an existing id");
                report.colliding_add += 1;
                continue;
            }
            (MemoryEvent::Add, None)
                if entry.id.trim().is_empty() || entry.text.trim().is_empty() =>
            {
                report.empty_add += 1;
                continue;
            }
            (MemoryEvent::Update, Some(_)) if entry.text.trim().is_empty() => {
                tracing::warn!(id = %entry.id, "Dropping UPDATE with blank text");
                report.empty_update += 1;
                continue;
            }
            (event, None) if event.references_existing() => {
                tracing::warn!(id = %entry.id, %event, "Dropping entry with unknown id");
                report.unknown_id += 1;
                continue;
            }
            _ => {}
        }

        if !seen.insert(entry.id.clone()) {
            tracing::warn!(id = %entry.id, event = %entry.event, "Dropping repeated decision for id");
            report.duplicate_id += 1;
            continue;
        }

        if let (MemoryEvent::Update, Some(stored_text)) = (entry.event, stored) {
            if entry.text.trim() == stored_text.trim() {
                entry.event = MemoryEvent::None;
                report.noop_update += 1;
            }
        }

        match (entry.event, stored) {
            (MemoryEvent::Update, Some(stored_text)) => {
                if entry.old_text.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    entry.old_text = Some(stored_text.to_string());
                    report.repaired_old_text += 1;
                }
            }
            _ => {
                if entry.old_text.take().is_some() {
                    report.repaired_old_text += 1;
                }
            }
        }

        kept.push(entry);
    }

    tracing::debug!(kept = kept.len(), ?report, "Enforced reconciliation id invariants");
    (kept, report)
}
