//! Path management for SPARR files.
//!
//! ```text
//! ~/.config/sparr/             # Config directory
//! └── config.toml              # SparrConfig
//!
//! ~/.local/share/sparr/        # Data directory
//! ├── run_state.toml           # Saved SessionContext of the current run
//! ├── transcripts/             # One TOML file per memory session
//! │   └── scenario-<uuid>.toml
//! └── logs/                    # Daily rolling log files
//! ```
//!
//! A base directory override puts everything under one root, which is what
//! tests and portable installs use.

use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "sparr";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find the platform {0} directory")]
    DirNotFound(&'static str),
}

impl From<PathError> for sparr_core::SparrError {
    fn from(err: PathError) -> Self {
        sparr_core::SparrError::config(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SparrPaths {
    base_dir: Option<PathBuf>,
}

impl SparrPaths {
    /// Creates a resolver; `None` means the platform directories from `dirs`.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_dir {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::DirNotFound("config")),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_dir {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::DirNotFound("data")),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn transcripts_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("transcripts"))
    }

    pub fn run_state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("run_state.toml"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}
