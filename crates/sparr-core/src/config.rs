//! Runtime configuration model.
//!
//! Only the shape and the validation rules live here; loading from disk is the
//! infrastructure layer's job.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SparrError};

pub const DEFAULT_TURN_THRESHOLD: u32 = 3;
pub const DEFAULT_STEP: f64 = 0.05;
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 120;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct SparrConfig {
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl SparrConfig {
    /// Checks every section and returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.learning.validate()?;
        self.agent.validate()?;
        Ok(())
    }
}

/// Knobs of the confrontation heuristic.
///
/// Both values are experimental, which is why they are configuration rather
/// than constants.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LearningConfig {
    /// Turn count from which p2 starts increasing instead of decreasing.
    #[serde(default = "default_turn_threshold")]
    pub turn_threshold: u32,
    /// Amount p2 moves per scenario turn.
    #[serde(default = "default_step")]
    pub step: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            turn_threshold: DEFAULT_TURN_THRESHOLD,
            step: DEFAULT_STEP,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.step > 0.0 && self.step <= 1.0) {
            return Err(SparrError::config(format!(
                "learning.step must be in (0, 1], got {}",
                self.step
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Upper bound for a single agent round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_AGENT_TIMEOUT_SECS,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(SparrError::config("agent.timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct StorageConfig {
    /// Overrides the default transcript directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcripts_dir: Option<PathBuf>,
}

fn default_turn_threshold() -> u32 {
    DEFAULT_TURN_THRESHOLD
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

fn default_timeout_secs() -> u64 {
    DEFAULT_AGENT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SparrConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning.turn_threshold, 3);
        assert_eq!(config.agent.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let mut config = SparrConfig::default();
        config.learning.step = 0.0;
        assert!(config.validate().is_err());

        config.learning.step = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = SparrConfig::default();
        config.agent.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(SparrError::Config(_))));
    }
}
