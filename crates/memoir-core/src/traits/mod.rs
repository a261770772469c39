//! Collaborator traits for memoir.

mod llm;
mod memory_store;

pub use llm::*;
pub use memory_store::*;
