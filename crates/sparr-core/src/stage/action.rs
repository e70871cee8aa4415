//! User actions accepted by the controller and what it reports back.

use serde::{Deserialize, Serialize};

use super::model::Stage;
use crate::learning::ParameterVector;
use crate::scenario::{FeedbackResult, PreparationInput, ScenarioOption};

/// Everything a front end can ask the controller to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UserAction {
    SubmitPreparation(PreparationInput),
    /// Start one of the catalogue scenarios by id.
    StartPrebuilt(String),
    /// 1-based index into the offered options.
    SelectScenario(usize),
    RequestOpeningLine,
    SendMessage(String),
    EndChat,
    /// Show feedback; ends the chat first when still in it.
    ViewFeedback,
    OptIntoReflection,
    RequestReflectionOpening,
    SendReflectionMessage(String),
    Finish,
    Restart,
}

impl UserAction {
    /// Short name used in logs and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::SubmitPreparation(_) => "submit_preparation",
            UserAction::StartPrebuilt(_) => "start_prebuilt",
            UserAction::SelectScenario(_) => "select_scenario",
            UserAction::RequestOpeningLine => "request_opening_line",
            UserAction::SendMessage(_) => "send_message",
            UserAction::EndChat => "end_chat",
            UserAction::ViewFeedback => "view_feedback",
            UserAction::OptIntoReflection => "opt_into_reflection",
            UserAction::RequestReflectionOpening => "request_reflection_opening",
            UserAction::SendReflectionMessage(_) => "send_reflection_message",
            UserAction::Finish => "finish",
            UserAction::Restart => "restart",
        }
    }
}

/// Result of a successfully handled [`UserAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Planning produced the options to choose from.
    OptionsReady { options: Vec<ScenarioOption> },
    /// The chat with the scenario agent is open.
    ScenarioStarted { scenario: ScenarioOption },
    /// The counterpart (or the reflection agent) spoke.
    AgentSaid { text: String },
    FeedbackReady { feedback: FeedbackResult },
    ReflectionStarted,
    Completed,
    Restarted,
}

/// Read-only snapshot of what the front end should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageView {
    Preparation,
    ScenarioSelection {
        options: Vec<ScenarioOption>,
    },
    ScenarioChat {
        scenario: ScenarioOption,
        turn_count: u32,
        parameters: ParameterVector,
    },
    Feedback {
        feedback: FeedbackResult,
    },
    Reflection {
        feedback: FeedbackResult,
        turn_count: u32,
    },
    Completed {
        feedback: Option<FeedbackResult>,
    },
}

impl StageView {
    pub fn stage(&self) -> Stage {
        match self {
            StageView::Preparation => Stage::Preparation,
            StageView::ScenarioSelection { .. } => Stage::ScenarioSelection,
            StageView::ScenarioChat { .. } => Stage::ScenarioChat,
            StageView::Feedback { .. } => Stage::Feedback,
            StageView::Reflection { .. } => Stage::Reflection,
            StageView::Completed { .. } => Stage::Completed,
        }
    }
}
