//! memoir-core - Core library for memoir.
//!
//! Turns a conversation into memory decisions through an unreliable language
//! model. The prompt builder renders the fact-extraction and reconciliation
//! requests, the normalizer turns whatever text comes back into a valid
//! result, and the invariant pass makes sure decisions only ever touch ids
//! that exist.
//!
//! # Example
//!
//! ```ignore
//! use memoir_core::{MemoryItem, Reconciler};
//!
//! let reconciler = Reconciler::new(llm);
//! let old = vec![MemoryItem::new("0", "Likes cheese pizza")];
//! let outcome = reconciler.process(&["I love cheese pizza"], &old).await?;
//! for entry in outcome.entries {
//!     println!("{} {} {}", entry.event, entry.id, entry.text);
//! }
//! ```

pub mod config;
pub mod error;
pub mod reconcile;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{LlmProvider, LlmProviderConfig, MemoirConfig};
pub use error::{ErrorCode, MemoirError, MemoirResult};
pub use reconcile::{
    build_fact_extraction_request, build_reconciliation_request, enforce_id_invariant,
    normalize_facts, normalize_facts_to_json, normalize_reconciliation, parse_reconciliation,
    FilterReport, PromptBuilder, PromptPair, ReconciliationOutcome, Reconciler,
};
pub use store::InMemoryStore;
pub use traits::{ApplyReport, GenerationOptions, Llm, LlmConfig, LlmResponse, MemoryStore};
pub use types::{
    FactExtractionResult, MemoryEvent, MemoryItem, Message, MessageRole, ReconciliationEntry,
};
