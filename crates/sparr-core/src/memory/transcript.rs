//! Transcript store trait.
//!
//! Defines the interface of the durable, keyed, erasable log that backs every
//! memory session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ChatTurn, TranscriptKey};
use crate::error::StorageError;

/// An abstract keyed append-only log.
///
/// Only [`AgentMemoryStore`](super::AgentMemoryStore) writes through this
/// trait. Agent collaborators may hold a reference for reading.
///
/// # Implementation Notes
///
/// - Content must survive a process restart.
/// - After `clear` or `delete_key` the previous content must be gone for good.
/// - Operations on a key that was never allocated (or was deleted) fail with
///   [`StorageError::NotFound`], except `delete_key`, which is idempotent.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Allocates an empty transcript under `id`.
    async fn allocate(&self, id: &str, created_at: DateTime<Utc>) -> Result<(), StorageError>;

    /// Appends turns, in order, to an allocated transcript.
    async fn append(&self, id: &str, turns: &[ChatTurn]) -> Result<(), StorageError>;

    /// Returns every turn of the transcript, oldest first.
    async fn read_all(&self, id: &str) -> Result<Vec<ChatTurn>, StorageError>;

    /// Removes all turns but keeps the key allocated.
    async fn clear(&self, id: &str) -> Result<(), StorageError>;

    /// Removes the key together with any content.
    async fn delete_key(&self, id: &str) -> Result<(), StorageError>;

    /// Lists every allocated key.
    async fn list_keys(&self) -> Result<Vec<TranscriptKey>, StorageError>;
}
