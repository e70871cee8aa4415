//! Core of SPARR: the session orchestration layer.
//!
//! The crate sequences a user through preparation, scenario chat, feedback
//! and reflection, owns the per-role erasable agent memory, and adapts the
//! learning profile handed to the scenario agent. A separate sparring game
//! pits the user against referee-designed opponents. LLM access and durable
//! storage are injected through [`agent::AgentInvoker`] and
//! [`memory::TranscriptStore`].

pub mod agent;
pub mod config;
pub mod error;
pub mod learning;
pub mod memory;
pub mod scenario;
pub mod sparring;
pub mod stage;

pub use error::{Result, SparrError};
