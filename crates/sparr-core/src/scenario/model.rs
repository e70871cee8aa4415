use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, SparrError};

/// How hard the counterpart pushes back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// What the user wants to rehearse, entered during preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationInput {
    /// The user's own role in the situation.
    pub role: String,
    pub situation: String,
    pub goal: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl PreparationInput {
    pub fn new(
        role: impl Into<String>,
        situation: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            situation: situation.into(),
            goal: goal.into(),
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Rejects input where any of the three text fields is blank.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("role", &self.role),
            ("situation", &self.situation),
            ("goal", &self.goal),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SparrError::validation(format!(
                "missing preparation field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            role: self.role.trim().to_string(),
            situation: self.situation.trim().to_string(),
            goal: self.goal.trim().to_string(),
            difficulty: self.difficulty,
        }
    }
}

/// One of the three scenarios offered after preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOption {
    pub title: String,
    pub summary: String,
    /// What the user should practise.
    #[serde(default)]
    pub focus: String,
    /// How the counterpart agent should behave.
    pub agent_instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_name: Option<String>,
}
