//! Core types for memoir.

mod memory_item;
mod message;

pub use memory_item::*;
pub use message::*;
