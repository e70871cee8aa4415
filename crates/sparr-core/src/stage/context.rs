use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::Stage;
use crate::agent::AgentRole;
use crate::learning::ParameterVector;
use crate::memory::MemorySession;
use crate::scenario::{FeedbackResult, PreparationInput, ScenarioOption};

/// State of one user run through the stages.
///
/// Owned exclusively by the [`StageController`](super::StageController);
/// front ends only ever see a shared reference. The context is serializable
/// so a front end can persist it and resume the run in a later process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub stage: Stage,
    pub preparation: Option<PreparationInput>,
    #[serde(default)]
    pub scenario_options: Vec<ScenarioOption>,
    pub selected_scenario: Option<ScenarioOption>,
    /// Memory session the run currently talks to, per role.
    #[serde(default)]
    pub active_sessions: BTreeMap<AgentRole, MemorySession>,
    #[serde(default)]
    pub parameters: ParameterVector,
    pub feedback: Option<FeedbackResult>,
    /// Completed user/agent exchanges in the scenario chat.
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub reflection_turn_count: u32,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, role: AgentRole) -> Option<&MemorySession> {
        self.active_sessions.get(&role)
    }

    /// Whether the scenario chat ended without a single user turn.
    pub fn scenario_skipped(&self) -> bool {
        self.feedback.as_ref().is_some_and(|f| f.skipped)
    }
}
