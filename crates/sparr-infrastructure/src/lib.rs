pub mod config_repository;
pub mod dir_transcript_store;
pub mod dto;
pub mod paths;
pub mod run_state_repository;
pub mod storage;

pub use crate::config_repository::TomlConfigRepository;
pub use crate::dir_transcript_store::DirTranscriptStore;
pub use crate::paths::{PathError, SparrPaths};
pub use crate::run_state_repository::TomlRunStateRepository;
