//! TOML-based configuration repository.
//!
//! Loads [`SparrConfig`] from `config.toml`. A missing file means defaults;
//! on first run the defaults are written so users have a file to edit.

use std::path::{Path, PathBuf};

use sparr_core::config::SparrConfig;
use sparr_core::error::{Result, SparrError};

use crate::paths::SparrPaths;
use crate::storage::AtomicTomlFile;

pub struct TomlConfigRepository {
    file: AtomicTomlFile<SparrConfig>,
}

impl TomlConfigRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Repository for `<config_dir>/sparr/config.toml`.
    pub fn default_location(paths: &SparrPaths) -> Result<Self> {
        Ok(Self::new(paths.config_file()?))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads and validates the configuration; defaults if the file is absent.
    pub fn load(&self) -> Result<SparrConfig> {
        let config = self
            .file
            .load()
            .map_err(|e| {
                SparrError::config(format!("Failed to read {}: {}", self.path().display(), e))
            })?
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), writing the defaults first if no file exists.
    pub fn load_or_init(&self) -> Result<SparrConfig> {
        if !self.file.exists() {
            let defaults = SparrConfig::default();
            self.save(&defaults)?;
            tracing::info!(path = %self.path().display(), "Wrote default configuration");
            return Ok(defaults);
        }
        self.load()
    }

    pub fn save(&self, config: &SparrConfig) -> Result<()> {
        config.validate()?;
        self.file.save(config).map_err(|e| {
            SparrError::config(format!("Failed to write {}: {}", self.path().display(), e))
        })
    }
}
