//! Storage and event log settings (`[storage]` and `[logging]` sections)
//!
//! ```toml
//! [storage]
//! data_dir = "~/.local/share/roundtable"
//!
//! [logging]
//! event_log = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Root of the session directories; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    /// Configured data directory, with a leading `~` expanded
    pub fn resolve_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(path) => expand_home(path),
            None => dirs::data_dir()
                .map(|d| d.join("roundtable"))
                .unwrap_or_else(|| PathBuf::from(".roundtable")),
        }
    }
}

fn expand_home(path: &PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.clone();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Append lifecycle events to `<data_dir>/events.jsonl`
    pub event_log: bool,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { event_log: true }
    }
}
