//! Infrastructure layer for roundtable
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod llm;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLlmConfig, FileLoggingConfig,
    FileModeratorConfig, FileParticipant, FileRoundtableConfig, FileStorageConfig,
    default_participants,
};
pub use llm::OpenAiCompatClient;
pub use logging::JsonlEventLog;
pub use storage::{FileSessionStore, MemorySessionStore, new_session_id};
