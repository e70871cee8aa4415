use serde::{Deserialize, Serialize};
use strum::Display;

use crate::agent::AgentRole;

/// One phase of the guided flow.
///
/// Stages only move forward; the single way back is an explicit restart,
/// which returns to [`Stage::Preparation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum Stage {
    /// Collecting role, situation and goal.
    #[default]
    Preparation,
    /// Three planned scenarios are on offer.
    ScenarioSelection,
    /// Role-play with the scenario agent.
    ScenarioChat,
    /// Feedback on the finished chat is available.
    Feedback,
    /// Optional debrief with the reflection agent.
    Reflection,
    /// The run is over and its memory erased.
    Completed,
}

impl Stage {
    /// The agent role whose memory the stage talks to, if it has one.
    pub fn owning_role(&self) -> Option<AgentRole> {
        match self {
            Stage::Preparation => Some(AgentRole::Planner),
            Stage::ScenarioChat => Some(AgentRole::Scenario),
            Stage::Feedback => Some(AgentRole::Feedback),
            Stage::Reflection => Some(AgentRole::Reflection),
            Stage::ScenarioSelection | Stage::Completed => None,
        }
    }

    /// Whether a restart may be requested from this stage.
    pub fn allows_restart(&self) -> bool {
        matches!(self, Stage::Feedback | Stage::Reflection | Stage::Completed)
    }
}
