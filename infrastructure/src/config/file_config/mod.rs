//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! [`FileConfig::validate`] checks them and the `to_*` methods convert them
//! into domain and application types.

mod llm;
mod participants;
mod roundtable;
mod storage;

pub use llm::FileLlmConfig;
pub use participants::{FileModeratorConfig, FileParticipant, default_participants};
pub use roundtable::FileRoundtableConfig;
pub use storage::{FileLoggingConfig, FileStorageConfig};

use roundtable_domain::{ConfigError, RoundtableSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("[roundtable]: {0}")]
    Roundtable(ConfigError),

    #[error("[[participants]]: {0}")]
    Participants(ConfigError),

    #[error("llm.timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("llm.model cannot be empty")]
    EmptyModelName,

    #[error("llm.base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("moderator.focus cannot be empty")]
    EmptyModeratorFocus,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Loop limits and stop rules
    pub roundtable: FileRoundtableConfig,
    pub storage: FileStorageConfig,
    /// Completion endpoint
    pub llm: FileLlmConfig,
    pub logging: FileLoggingConfig,
    /// Reviewer roster; empty means the default panel
    pub participants: Vec<FileParticipant>,
    pub moderator: FileModeratorConfig,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.roundtable
            .to_roundtable_config()
            .validate()
            .map_err(ConfigValidationError::Roundtable)?;

        if self.llm.timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBaseUrl);
        }
        if self.moderator.focus.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModeratorFocus);
        }

        self.to_snapshot()
            .validate()
            .map_err(ConfigValidationError::Participants)
    }

    /// Roster snapshot for a new session
    pub fn to_snapshot(&self) -> RoundtableSnapshot {
        let participants = if self.participants.is_empty() {
            default_participants()
        } else {
            self.participants
                .iter()
                .map(FileParticipant::to_persona)
                .collect()
        };

        let snapshot = RoundtableSnapshot::new(participants, &self.moderator.focus);
        match &self.moderator.convergence_criteria {
            Some(criteria) => snapshot.with_convergence_criteria(criteria),
            None => snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[roundtable]
max_iterations = 5
delta_threshold = 0.02

[storage]
data_dir = "/tmp/roundtable"

[llm]
model = "gpt-4o-mini"
timeout_seconds = 30

[logging]
event_log = false

[[participants]]
name = "Security"
role = "Threats"
instructions = "Find exploits."

[moderator]
focus = "Close every High issue"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.roundtable.max_iterations, 5);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(!config.logging.event_log);
        assert!(config.validate().is_ok());

        let snapshot = config.to_snapshot();
        assert_eq!(snapshot.participant_names(), vec!["Security"]);
        assert_eq!(snapshot.moderator_focus, "Close every High issue");
        assert!(snapshot.convergence_criteria.is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_snapshot().participants.len(), 3);
        assert!(config.logging.event_log);
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = FileConfig::default();
        config.roundtable.max_iterations = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Roundtable(
                ConfigError::InvalidMaxIterations(0)
            ))
        );

        let mut config = FileConfig::default();
        config.roundtable.delta_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::Roundtable(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_llm_settings() {
        let mut config = FileConfig::default();
        config.llm.timeout_seconds = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidTimeout));

        let mut config = FileConfig::default();
        config.llm.model = " ".to_string();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyModelName));
    }

    #[test]
    fn test_validate_rejects_duplicate_participants() {
        let toml_str = r#"
[[participants]]
name = "Twin"
role = "a"
instructions = "x"

[[participants]]
name = "Twin"
role = "b"
instructions = "y"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Participants(
                ConfigError::DuplicateParticipant("Twin".to_string())
            ))
        );
    }
}
