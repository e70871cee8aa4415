//! Persistence of the current run's [`SessionContext`].
//!
//! The saved context lets a later process resume the run. It references
//! memory sessions by pseudonymous id only; transcripts stay in the
//! transcript store.

use std::path::PathBuf;

use sparr_core::error::StorageError;
use sparr_core::stage::SessionContext;

use crate::dto::RunStateRecord;
use crate::paths::SparrPaths;
use crate::storage::AtomicTomlFile;

pub struct TomlRunStateRepository {
    file: AtomicTomlFile<RunStateRecord>,
}

impl TomlRunStateRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn default_location(paths: &SparrPaths) -> Result<Self, StorageError> {
        let path = paths
            .run_state_file()
            .map_err(|e| StorageError::unavailable(e.to_string()))?;
        Ok(Self::new(path))
    }

    /// The saved context, or `None` if nothing was saved.
    pub fn load(&self) -> Result<Option<SessionContext>, StorageError> {
        match self.file.load()? {
            Some(record) => Ok(Some(SessionContext::try_from(record)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, context: &SessionContext) -> Result<(), StorageError> {
        self.file.save(&RunStateRecord::from(context))?;
        Ok(())
    }

    /// Forgets the saved run.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.file.remove()?;
        Ok(())
    }
}
