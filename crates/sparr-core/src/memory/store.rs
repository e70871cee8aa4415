use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::model::{ChatTurn, MemorySession};
use super::transcript::TranscriptStore;
use crate::agent::AgentRole;
use crate::error::StorageError;

/// Manages the lifecycle of memory sessions and their transcripts.
///
/// `AgentMemoryStore` is responsible for:
/// - Minting pseudonymous session ids
/// - Keeping at most one live session per role
/// - Erasing transcripts on reset, delete and restart
/// - Being the only writer of the transcript store
pub struct AgentMemoryStore {
    /// Durable backend for transcript content
    store: Arc<dyn TranscriptStore>,
    /// Live session per role
    live: RwLock<HashMap<AgentRole, MemorySession>>,
}

impl AgentMemoryStore {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            store,
            live: RwLock::new(HashMap::new()),
        }
    }

    /// Read access to the backing store, for agent collaborators.
    pub fn transcript_store(&self) -> Arc<dyn TranscriptStore> {
        Arc::clone(&self.store)
    }

    /// Creates a session for `role`, tearing down any existing one.
    ///
    /// The new transcript is allocated before the old one is erased. If the
    /// store fails at any point the previous session remains live and
    /// untouched, so callers never observe a role whose record was lost.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be reached.
    pub async fn create(&self, role: AgentRole) -> Result<MemorySession, StorageError> {
        let session = MemorySession::new(role);
        self.store
            .allocate(&session.pseudonymous_id, session.created_at)
            .await?;

        let mut live = self.live.write().await;
        if let Some(previous) = live.get(&role).cloned() {
            if let Err(err) = self.retire(&previous).await {
                if let Err(rollback) = self.store.delete_key(&session.pseudonymous_id).await {
                    tracing::warn!(
                        target: "sparr::memory",
                        role = %role,
                        error = %rollback,
                        "Failed to release unused transcript after aborted create"
                    );
                }
                return Err(err);
            }
        }
        live.insert(role, session.clone());
        drop(live);

        tracing::debug!(target: "sparr::memory", role = %role, id = %session.pseudonymous_id, "Memory session created");
        Ok(session)
    }

    /// Returns the live session for `role`, if any.
    pub async fn get(&self, role: AgentRole) -> Option<MemorySession> {
        self.live.read().await.get(&role).cloned()
    }

    /// Roles that currently have a live session.
    pub async fn live_roles(&self) -> Vec<AgentRole> {
        let mut roles: Vec<AgentRole> = self.live.read().await.keys().copied().collect();
        roles.sort();
        roles
    }

    /// Erases the transcript content of a live session, keeping its id.
    pub async fn clear(&self, session: &MemorySession) -> Result<(), StorageError> {
        self.ensure_live(session).await?;
        self.store.clear(&session.pseudonymous_id).await
    }

    /// Replaces the session for `role` with a brand-new one.
    ///
    /// No turn of the previous session survives: its transcript is cleared and
    /// its key deleted before the new record becomes live.
    pub async fn reset(&self, role: AgentRole) -> Result<MemorySession, StorageError> {
        let session = self.create(role).await?;
        tracing::info!(target: "sparr::memory", role = %role, "Memory session reset");
        Ok(session)
    }

    /// Tears down the session for `role` without creating a new one.
    ///
    /// Returns the erased record, or `None` if the role had no session.
    pub async fn delete(&self, role: AgentRole) -> Result<Option<MemorySession>, StorageError> {
        let mut live = self.live.write().await;
        let Some(session) = live.get(&role).cloned() else {
            return Ok(None);
        };
        self.erase(&session).await?;
        live.remove(&role);
        Ok(Some(session))
    }

    /// Tears down every live session.
    ///
    /// Stops at the first failure; sessions erased before it are gone, the
    /// failing one and any after it stay live.
    pub async fn delete_all(&self) -> Result<usize, StorageError> {
        let mut live = self.live.write().await;
        let mut sessions: Vec<MemorySession> = live.values().cloned().collect();
        sessions.sort_by_key(|s| s.role);

        let mut erased = 0;
        for session in sessions {
            self.erase(&session).await?;
            live.remove(&session.role);
            erased += 1;
        }

        tracing::info!(target: "sparr::memory", erased, "All memory sessions deleted");
        Ok(erased)
    }

    /// Appends turns to a live session's transcript.
    pub async fn append(
        &self,
        session: &MemorySession,
        turns: &[ChatTurn],
    ) -> Result<(), StorageError> {
        self.ensure_live(session).await?;
        self.store.append(&session.pseudonymous_id, turns).await
    }

    /// Full transcript of a live session.
    pub async fn transcript(&self, session: &MemorySession) -> Result<Vec<ChatTurn>, StorageError> {
        self.ensure_live(session).await?;
        self.store.read_all(&session.pseudonymous_id).await
    }

    /// Number of stored turns of a live session.
    pub async fn turn_count(&self, session: &MemorySession) -> Result<usize, StorageError> {
        Ok(self.transcript(session).await?.len())
    }

    /// Adopts sessions persisted by a previous process.
    ///
    /// For every role the already-live session wins, otherwise the newest
    /// persisted one. Every other persisted key of that role is erased. Keys
    /// that are not pseudonymous session ids are left alone.
    pub async fn restore(&self) -> Result<Vec<MemorySession>, StorageError> {
        let keys = self.store.list_keys().await?;
        let mut live = self.live.write().await;

        let mut candidates: HashMap<AgentRole, Vec<MemorySession>> = HashMap::new();
        for key in keys {
            if let Some(session) = MemorySession::from_key(&key.id, key.created_at) {
                candidates.entry(session.role).or_default().push(session);
            }
        }

        let mut adopted = Vec::new();
        for (role, mut sessions) in candidates {
            sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let winner_id = match live.get(&role) {
                Some(current) => current.pseudonymous_id.clone(),
                None => {
                    let newest = sessions[0].clone();
                    live.insert(role, newest.clone());
                    adopted.push(newest.clone());
                    newest.pseudonymous_id
                }
            };
            for stale in sessions.iter().filter(|s| s.pseudonymous_id != winner_id) {
                self.erase(stale).await?;
            }
        }

        adopted.sort_by_key(|s| s.role);
        tracing::info!(target: "sparr::memory", adopted = adopted.len(), "Memory sessions restored");
        Ok(adopted)
    }

    async fn ensure_live(&self, session: &MemorySession) -> Result<(), StorageError> {
        let live = self.live.read().await;
        match live.get(&session.role) {
            Some(current) if current.pseudonymous_id == session.pseudonymous_id => Ok(()),
            _ => Err(StorageError::StaleSession {
                id: session.pseudonymous_id.clone(),
            }),
        }
    }

    /// Erases a session that is being replaced.
    ///
    /// If the key cannot be deleted after its content was cleared, the
    /// previous turns are written back so the session stays usable.
    async fn retire(&self, session: &MemorySession) -> Result<(), StorageError> {
        let id = &session.pseudonymous_id;
        let turns = match self.store.read_all(id).await {
            Ok(turns) => turns,
            Err(StorageError::NotFound { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };
        match self.store.clear(id).await {
            Ok(()) | Err(StorageError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        if let Err(err) = self.store.delete_key(id).await {
            if !turns.is_empty() {
                if let Err(restore) = self.store.append(id, &turns).await {
                    tracing::warn!(
                        target: "sparr::memory",
                        role = %session.role,
                        error = %restore,
                        "Failed to restore transcript after aborted teardown"
                    );
                }
            }
            return Err(err);
        }
        Ok(())
    }

    async fn erase(&self, session: &MemorySession) -> Result<(), StorageError> {
        match self.store.clear(&session.pseudonymous_id).await {
            Ok(()) | Err(StorageError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        self.store.delete_key(&session.pseudonymous_id).await
    }
}
