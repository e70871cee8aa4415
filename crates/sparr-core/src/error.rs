//! Error types for the SPARR session core.

use std::time::Duration;

use thiserror::Error;

use crate::stage::Stage;

/// Failure reported by (or about) an agent invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentCallError {
    /// The collaborator could not produce a response.
    #[error("agent call failed: {0}")]
    Failed(String),

    /// The collaborator answered, but the answer could not be used.
    #[error("agent returned malformed output: {0}")]
    Malformed(String),

    /// No answer arrived within the configured bound.
    #[error("agent call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller abandoned the call before it completed.
    #[error("agent call was cancelled")]
    Cancelled,
}

/// Failure of the durable transcript store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The backing store cannot be reached at all.
    #[error("transcript store unavailable: {0}")]
    Unavailable(String),

    /// No transcript is allocated under the key.
    #[error("transcript not found: '{id}'")]
    NotFound { id: String },

    /// The session is not the live session for its role anymore.
    #[error("memory session '{id}' is not live")]
    StaleSession { id: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },
}

impl StorageError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

/// A shared error type for the whole session core.
///
/// Every controller action returns this type. The variants map onto the three
/// recoverability classes the UI distinguishes: validation problems the user
/// can correct, agent failures the user can retry, and storage failures that
/// abort the current action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparrError {
    /// Input rejected before any side effect happened.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The agent collaborator failed.
    #[error(transparent)]
    AgentCall(#[from] AgentCallError),

    /// The transcript store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The requested action is not legal in the current stage.
    #[error("'{action}' is not allowed during {stage:?}")]
    InvalidTransition { stage: Stage, action: &'static str },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SparrError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn invalid_transition(stage: Stage, action: &'static str) -> Self {
        Self::InvalidTransition { stage, action }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_agent_call(&self) -> bool {
        matches!(self, Self::AgentCall(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Whether the user can simply try the same action again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AgentCall(_) | Self::Storage(StorageError::Unavailable(_))
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SparrError>`.
pub type Result<T> = std::result::Result<T, SparrError>;
