//! Data Transfer Objects (DTOs) for persistence.
//!
//! These types are the on-disk schema. They stay private to the
//! infrastructure layer and convert to and from the core domain types.
//!
//! ### Transcript Version History
//! - **1.0.0**: `{schema_version, id, created_at, turns = [{speaker, text, timestamp}]}`
//!
//! ### Run State Version History
//! - **1.0.0**: Snapshot of one `SessionContext`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sparr_core::agent::AgentRole;
use sparr_core::error::StorageError;
use sparr_core::learning::ParameterVector;
use sparr_core::memory::{ChatTurn, MemorySession, Speaker};
use sparr_core::scenario::{FeedbackResult, PreparationInput, ScenarioOption};
use sparr_core::stage::{SessionContext, Stage};

pub const TRANSCRIPT_SCHEMA_VERSION: &str = "1.0.0";
pub const RUN_STATE_SCHEMA_VERSION: &str = "1.0.0";

fn transcript_version() -> String {
    TRANSCRIPT_SCHEMA_VERSION.to_string()
}

fn run_state_version() -> String {
    RUN_STATE_SCHEMA_VERSION.to_string()
}

/// One transcript file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default = "transcript_version")]
    pub schema_version: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub turns: Vec<TurnRecord>,
}

impl TranscriptRecord {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: transcript_version(),
            id: id.into(),
            created_at,
            turns: Vec::new(),
        }
    }

    pub fn into_turns(self) -> Vec<ChatTurn> {
        self.turns.into_iter().map(ChatTurn::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatTurn> for TurnRecord {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            speaker: turn.speaker,
            text: turn.text.clone(),
            timestamp: turn.timestamp,
        }
    }
}

impl From<TurnRecord> for ChatTurn {
    fn from(record: TurnRecord) -> Self {
        ChatTurn {
            speaker: record.speaker,
            text: record.text,
            timestamp: record.timestamp,
        }
    }
}

/// Saved state of the current run.
///
/// Memory sessions are kept as a list rather than a role-keyed table so the
/// file reads naturally as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStateRecord {
    #[serde(default = "run_state_version")]
    pub schema_version: String,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<PreparationInput>,
    #[serde(default)]
    pub scenario_options: Vec<ScenarioOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_scenario: Option<ScenarioOption>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    pub parameters: [f64; 5],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResult>,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub reflection_turn_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub role: AgentRole,
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&SessionContext> for RunStateRecord {
    fn from(context: &SessionContext) -> Self {
        Self {
            schema_version: run_state_version(),
            stage: context.stage,
            preparation: context.preparation.clone(),
            scenario_options: context.scenario_options.clone(),
            selected_scenario: context.selected_scenario.clone(),
            sessions: context
                .active_sessions
                .values()
                .map(|session| SessionRecord {
                    role: session.role,
                    id: session.pseudonymous_id.clone(),
                    created_at: session.created_at,
                })
                .collect(),
            parameters: context.parameters.values(),
            feedback: context.feedback.clone(),
            turn_count: context.turn_count,
            reflection_turn_count: context.reflection_turn_count,
        }
    }
}

impl TryFrom<RunStateRecord> for SessionContext {
    type Error = StorageError;

    fn try_from(record: RunStateRecord) -> Result<Self, Self::Error> {
        let [p1, p2, p3, p4, p5] = record.parameters;
        let parameters =
            ParameterVector::new(p1, p2, p3, p4, p5).map_err(|e| StorageError::Serialization {
                format: "toml".into(),
                message: e.to_string(),
            })?;

        let mut context = SessionContext {
            stage: record.stage,
            preparation: record.preparation,
            scenario_options: record.scenario_options,
            selected_scenario: record.selected_scenario,
            parameters,
            feedback: record.feedback,
            turn_count: record.turn_count,
            reflection_turn_count: record.reflection_turn_count,
            ..SessionContext::default()
        };
        for session in record.sessions {
            // ids that do not encode their role are dropped
            if let Some(parsed) = MemorySession::from_key(&session.id, session.created_at) {
                if parsed.role == session.role {
                    context.active_sessions.insert(parsed.role, parsed);
                }
            }
        }
        Ok(context)
    }
}
