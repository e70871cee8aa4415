use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::model::{ChatTurn, TranscriptKey};
use super::transcript::TranscriptStore;
use crate::error::StorageError;

struct Entry {
    created_at: DateTime<Utc>,
    turns: Vec<ChatTurn>,
}

/// Process-local [`TranscriptStore`].
///
/// Not durable across restarts; meant for tests and for ephemeral runs where
/// nothing may touch the disk.
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn allocate(&self, id: &str, created_at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            id.to_string(),
            Entry {
                created_at,
                turns: Vec::new(),
            },
        );
        Ok(())
    }

    async fn append(&self, id: &str, turns: &[ChatTurn]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(id))?;
        entry.turns.extend_from_slice(turns);
        Ok(())
    }

    async fn read_all(&self, id: &str) -> Result<Vec<ChatTurn>, StorageError> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .map(|entry| entry.turns.clone())
            .ok_or_else(|| StorageError::not_found(id))
    }

    async fn clear(&self, id: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(id))?;
        entry.turns.clear();
        Ok(())
    }

    async fn delete_key(&self, id: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<TranscriptKey>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|(id, entry)| TranscriptKey {
                id: id.clone(),
                created_at: entry.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_read_in_order() {
        let store = InMemoryTranscriptStore::new();
        store.allocate("k", Utc::now()).await.unwrap();
        store
            .append("k", &[ChatTurn::user("hi"), ChatTurn::agent("hello")])
            .await
            .unwrap();

        let turns = store.read_all("k").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "hi");
        assert_eq!(turns[1].text, "hello");
    }

    #[tokio::test]
    async fn test_deleted_key_is_unreadable() {
        let store = InMemoryTranscriptStore::new();
        store.allocate("k", Utc::now()).await.unwrap();
        store.append("k", &[ChatTurn::user("secret")]).await.unwrap();
        store.delete_key("k").await.unwrap();

        assert!(matches!(
            store.read_all("k").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(store.append("k", &[ChatTurn::user("x")]).await.is_err());
        // idempotent
        store.delete_key("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_keeps_key() {
        let store = InMemoryTranscriptStore::new();
        store.allocate("k", Utc::now()).await.unwrap();
        store.append("k", &[ChatTurn::user("secret")]).await.unwrap();
        store.clear("k").await.unwrap();

        assert!(store.read_all("k").await.unwrap().is_empty());
        assert_eq!(store.list_keys().await.unwrap().len(), 1);
    }
}
