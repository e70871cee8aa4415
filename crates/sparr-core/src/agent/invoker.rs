//! Contract of the external agent collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::role::AgentRole;
use crate::error::AgentCallError;
use crate::learning::ParameterVector;
use crate::scenario::{Difficulty, PreparationInput, ScenarioOption};
use crate::sparring::{SparringLevel, SparringTopic};

/// What the controller is asking the agent to do.
///
/// Collaborators use this to select a prompt; the core itself never builds
/// prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPurpose {
    /// Produce three scenario options as JSON.
    Plan,
    /// Counterpart speaks first, before any user turn.
    OpeningLine,
    /// Counterpart answers a user message.
    Turn,
    /// Review the scenario transcript.
    Feedback,
    /// First question of the reflection chat.
    ReflectionOpening,
    /// Answer to a reflection message.
    ReflectionTurn,
    /// Design a sparring opponent as JSON.
    SparringLevel,
    /// Write a batch of sparring rounds as JSON.
    SparringRounds,
}

/// What the referee needs for a sparring call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeBrief {
    pub topic: SparringTopic,
    /// Endless level number, doubling as difficulty on a 1 to 10 scale.
    pub level_number: u32,
    /// The opponent, present for round calls.
    pub level: Option<SparringLevel>,
    pub round_count: usize,
}

/// Payload handed to [`AgentInvoker::invoke`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub purpose: InputPurpose,
    /// Role instructions, e.g. the selected scenario's agent instructions.
    pub instructions: String,
    /// Learning profile, present for scenario calls only.
    pub parameters: Option<ParameterVector>,
    /// The user's message, or the rendered transcript for feedback.
    pub user_message: String,
    /// The preparation context, when one is known.
    pub preparation: Option<PreparationInput>,
    /// The scenario being played, for scenario and feedback calls.
    #[serde(default)]
    pub scenario: Option<ScenarioOption>,
    pub difficulty: Difficulty,
    /// Set on reflection calls when the scenario ended before any turn.
    #[serde(default)]
    pub scenario_skipped: bool,
    /// Present for sparring calls only.
    #[serde(default)]
    pub referee: Option<RefereeBrief>,
}

impl AgentInput {
    pub fn new(purpose: InputPurpose, user_message: impl Into<String>) -> Self {
        Self {
            purpose,
            instructions: String::new(),
            parameters: None,
            user_message: user_message.into(),
            preparation: None,
            scenario: None,
            difficulty: Difficulty::default(),
            scenario_skipped: false,
            referee: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterVector) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_preparation(mut self, preparation: Option<&PreparationInput>) -> Self {
        if let Some(preparation) = preparation {
            self.difficulty = preparation.difficulty;
            self.preparation = Some(preparation.clone());
        }
        self
    }

    pub fn with_scenario(mut self, scenario: Option<&ScenarioOption>) -> Self {
        self.scenario = scenario.cloned();
        self
    }

    pub fn with_scenario_skipped(mut self, skipped: bool) -> Self {
        self.scenario_skipped = skipped;
        self
    }

    pub fn with_referee(mut self, brief: RefereeBrief) -> Self {
        self.referee = Some(brief);
        self
    }
}

/// Textual answer of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
}

impl AgentReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An abstract agent backend.
///
/// Implementations receive the pseudonymous memory id of the live session for
/// `role` and may read that session's transcript to give the agent its
/// conversational memory. They must not write to the transcript store; the
/// controller commits turns itself once a reply has arrived.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        role: AgentRole,
        memory_id: &str,
        input: &AgentInput,
    ) -> Result<AgentReply, AgentCallError>;
}
