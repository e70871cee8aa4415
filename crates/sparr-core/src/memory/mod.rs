//! Per-role conversational memory.
//!
//! - `model`: session records, chat turns and pseudonymous ids
//! - `transcript`: the durable transcript store trait
//! - `store`: [`AgentMemoryStore`], the lifecycle manager
//! - `in_memory`: a non-durable store for tests and ephemeral runs

mod in_memory;
mod model;
mod store;
mod transcript;

pub use in_memory::InMemoryTranscriptStore;
pub use model::{ChatTurn, MemorySession, Speaker, TranscriptKey, parse_role};
pub use store::AgentMemoryStore;
pub use transcript::TranscriptStore;
