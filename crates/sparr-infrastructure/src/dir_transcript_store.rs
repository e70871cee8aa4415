//! Directory-backed TranscriptStore implementation

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sparr_core::error::StorageError;
use sparr_core::memory::{ChatTurn, TranscriptKey, TranscriptStore};

use crate::dto::{TranscriptRecord, TurnRecord};
use crate::paths::SparrPaths;
use crate::storage::AtomicTomlFile;

/// A transcript store keeping one TOML file per memory session.
///
/// Directory structure:
/// ```text
/// transcripts/
/// ├── scenario-<uuid>.toml
/// └── feedback-<uuid>.toml
/// ```
///
/// File I/O runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct DirTranscriptStore {
    dir: PathBuf,
}

impl DirTranscriptStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::unavailable(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// Opens the store at the default transcripts directory.
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = SparrPaths::default()
            .transcripts_dir()
            .map_err(|e| StorageError::unavailable(e.to_string()))?;
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, id: &str) -> Result<AtomicTomlFile<TranscriptRecord>, StorageError> {
        validate_id(id)?;
        Ok(AtomicTomlFile::new(self.dir.join(format!("{id}.toml"))))
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    {
        tokio::task::spawn_blocking(op)
            .await
            .map_err(|e| StorageError::unavailable(format!("storage task failed: {e}")))?
    }
}

/// Ids become file names, so only `[a-z0-9-]` is accepted.
fn validate_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::io(format!("invalid transcript id '{id}'")))
    }
}

#[async_trait]
impl TranscriptStore for DirTranscriptStore {
    async fn allocate(&self, id: &str, created_at: DateTime<Utc>) -> Result<(), StorageError> {
        let file = self.file(id)?;
        let record = TranscriptRecord::new(id, created_at);
        self.blocking(move || Ok(file.save(&record)?)).await?;
        tracing::debug!(target: "sparr::storage", id, "Transcript allocated");
        Ok(())
    }

    async fn append(&self, id: &str, turns: &[ChatTurn]) -> Result<(), StorageError> {
        let file = self.file(id)?;
        let records: Vec<TurnRecord> = turns.iter().map(TurnRecord::from).collect();
        let key = id.to_string();
        self.blocking(move || {
            let written = file.update_existing(|record| record.turns.extend(records))?;
            if written {
                Ok(())
            } else {
                Err(StorageError::not_found(key))
            }
        })
        .await
    }

    async fn read_all(&self, id: &str) -> Result<Vec<ChatTurn>, StorageError> {
        let file = self.file(id)?;
        let key = id.to_string();
        self.blocking(move || match file.load()? {
            Some(record) => Ok(record.into_turns()),
            None => Err(StorageError::not_found(key)),
        })
        .await
    }

    async fn clear(&self, id: &str) -> Result<(), StorageError> {
        let file = self.file(id)?;
        let key = id.to_string();
        self.blocking(move || {
            let written = file.update_existing(|record| record.turns.clear())?;
            if written {
                Ok(())
            } else {
                Err(StorageError::not_found(key))
            }
        })
        .await
    }

    async fn delete_key(&self, id: &str) -> Result<(), StorageError> {
        let file = self.file(id)?;
        let existed = self.blocking(move || Ok(file.remove()?)).await?;
        if existed {
            tracing::debug!(target: "sparr::storage", id, "Transcript deleted");
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<TranscriptKey>, StorageError> {
        let dir = self.dir.clone();
        self.blocking(move || {
            let mut keys = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                let is_transcript = path.extension().is_some_and(|ext| ext == "toml")
                    && path
                        .file_name()
                        .is_some_and(|name| !name.to_string_lossy().starts_with('.'));
                if !is_transcript {
                    continue;
                }

                match AtomicTomlFile::<TranscriptRecord>::new(path.clone()).load() {
                    Ok(Some(record)) => keys.push(TranscriptKey {
                        id: record.id,
                        created_at: record.created_at,
                    }),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(target: "sparr::storage", path = %path.display(), error = %e, "Skipping unreadable transcript file");
                    }
                }
            }
            keys.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (DirTranscriptStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = DirTranscriptStore::new(temp_dir.path().join("transcripts")).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_allocate_append_read() {
        let (store, _tmp) = store();
        store.allocate("scenario-1", Utc::now()).await.unwrap();
        store
            .append("scenario-1", &[ChatTurn::user("hi"), ChatTurn::agent("hello")])
            .await
            .unwrap();
        store.append("scenario-1", &[ChatTurn::user("again")]).await.unwrap();

        let turns = store.read_all("scenario-1").await.unwrap();
        let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hello", "again"]);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let (store, _tmp) = store();
        assert!(matches!(
            store.read_all("planner-0").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            store.append("planner-0", &[ChatTurn::user("x")]).await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            store.clear("planner-0").await,
            Err(StorageError::NotFound { .. })
        ));
        store.delete_key("planner-0").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_erases_content_from_disk() {
        let (store, _tmp) = store();
        store.allocate("feedback-1", Utc::now()).await.unwrap();
        store
            .append("feedback-1", &[ChatTurn::user("very private words")])
            .await
            .unwrap();

        store.clear("feedback-1").await.unwrap();

        let raw = fs::read_to_string(store.dir().join("feedback-1.toml")).unwrap();
        assert!(!raw.contains("very private words"));
        assert!(store.read_all("feedback-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let (store, _tmp) = store();
        store.allocate("reflection-1", Utc::now()).await.unwrap();
        store.delete_key("reflection-1").await.unwrap();

        assert!(!store.dir().join("reflection-1.toml").exists());
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_keys_ignores_foreign_files() {
        let (store, _tmp) = store();
        let created_at = Utc::now();
        store.allocate("scenario-a", created_at).await.unwrap();
        store.allocate("planner-b", created_at).await.unwrap();
        fs::write(store.dir().join("notes.txt"), "not a transcript").unwrap();
        fs::write(store.dir().join("broken.toml"), "id = [").unwrap();

        let keys = store.list_keys().await.unwrap();

        let ids: Vec<&str> = keys.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["planner-b", "scenario-a"]);
        assert_eq!(keys[0].created_at, created_at);
    }

    #[tokio::test]
    async fn test_rejects_ids_that_are_not_file_safe() {
        let (store, _tmp) = store();
        for id in ["", "../escape", "Scenario-1", "a/b", "x.toml"] {
            assert!(store.allocate(id, Utc::now()).await.is_err(), "{id:?} accepted");
        }
    }
}
