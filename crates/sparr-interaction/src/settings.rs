//! Connection settings for the OpenAI-compatible backend.
//!
//! Read from the environment:
//! - `OPENAI_API_KEY` (required)
//! - `OPENAI_BASE_URL` (optional, defaults to the public API)
//! - `PLANNER_AGENT_MODEL`, `SCENARIO_AGENT_MODEL`, `FEEDBACK_AGENT_MODEL`,
//!   `REFLECTION_AGENT_MODEL`, `REFEREE_AGENT_MODEL` (optional, per-role
//!   model overrides)
//! - `OPENAI_MAX_TOKENS` (optional)

use std::collections::BTreeMap;
use std::env;

use sparr_core::agent::AgentRole;
use strum::IntoEnumIterator;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct InvokerSettings {
    pub api_key: String,
    pub base_url: String,
    pub models: BTreeMap<AgentRole, String>,
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for InvokerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokerSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl InvokerSettings {
    /// Settings with the default endpoint and [`DEFAULT_MODEL`] for every role.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: AgentRole::iter()
                .map(|role| (role, DEFAULT_MODEL.to_string()))
                .collect(),
            max_tokens: None,
        }
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(SettingsError::MissingApiKey)?;
        let mut settings = Self::new(api_key.trim());

        if let Some(base_url) = get("OPENAI_BASE_URL") {
            settings.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        for role in AgentRole::iter() {
            let name = format!("{}_AGENT_MODEL", role.as_str().to_uppercase());
            if let Some(model) = get(name.as_str()) {
                settings.models.insert(role, model.trim().to_string());
            }
        }
        if let Some(value) = get("OPENAI_MAX_TOKENS") {
            let max_tokens = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(SettingsError::InvalidNumber {
                    name: "OPENAI_MAX_TOKENS",
                    value,
                })?;
            settings.max_tokens = Some(max_tokens);
        }
        Ok(settings)
    }

    pub fn with_model(mut self, role: AgentRole, model: impl Into<String>) -> Self {
        self.models.insert(role, model.into());
        self
    }

    pub fn model_for(&self, role: AgentRole) -> &str {
        self.models
            .get(&role)
            .map(String::as_str)
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}
