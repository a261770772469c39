//! Memory reconciliation: prompt protocols, response normalization and the
//! identity invariants that guard the storage layer.

mod invariants;
mod normalizer;
mod pipeline;
mod prompts;

pub use invariants::{enforce_id_invariant, FilterReport};
pub use normalizer::{
    normalize_facts, normalize_facts_to_json, normalize_reconciliation, parse_reconciliation,
};
pub use pipeline::{ReconciliationOutcome, Reconciler};
pub use prompts::{
    build_fact_extraction_request, build_reconciliation_request, join_turns, PromptBuilder,
    PromptPair,
};
