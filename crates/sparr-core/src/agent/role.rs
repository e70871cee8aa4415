use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of agent roles taking part in a training run.
///
/// The lowercase string form doubles as the prefix of every pseudonymous
/// memory id, so it must stay stable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRole {
    /// Counterpart in the role-play.
    Scenario,
    /// Reviewer that turns the scenario transcript into feedback.
    Feedback,
    /// Guide for the optional debrief chat.
    Reflection,
    /// Generates the three scenario options from the preparation input.
    Planner,
    /// Designs opponents and rounds for verbal sparring.
    Referee,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
