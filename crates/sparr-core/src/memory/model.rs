use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentRole;

/// A pseudonymous, erasable conversational memory bound to one agent role.
///
/// The id is `"<role>-<uuid v4>"` and carries no information about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySession {
    pub role: AgentRole,
    pub pseudonymous_id: String,
    pub created_at: DateTime<Utc>,
}

impl MemorySession {
    /// Mints a fresh session record. Nothing is allocated in any store yet.
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            pseudonymous_id: format!("{}-{}", role, Uuid::new_v4()),
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a record for a persisted key, if the key is a well-formed id.
    pub fn from_key(id: &str, created_at: DateTime<Utc>) -> Option<Self> {
        let role = parse_role(id)?;
        Some(Self {
            role,
            pseudonymous_id: id.to_string(),
            created_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.pseudonymous_id
    }
}

/// Role encoded in a pseudonymous id, or `None` if the id is not of the form
/// `"<role>-<uuid>"`.
pub fn parse_role(id: &str) -> Option<AgentRole> {
    let (prefix, rest) = id.split_once('-')?;
    let role = AgentRole::from_str(prefix).ok()?;
    Uuid::parse_str(rest).ok()?;
    Some(role)
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// A single entry of a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A persisted transcript key as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptKey {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
