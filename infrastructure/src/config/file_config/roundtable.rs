//! Loop limits from TOML (`[roundtable]` section)
//!
//! ```toml
//! [roundtable]
//! max_iterations = 3
//! delta_threshold = 0.05
//! stop_on_no_high_issues = true
//! force_max_iterations = false
//! ```

use roundtable_application::RunOptions;
use roundtable_domain::RoundtableConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoundtableConfig {
    pub max_iterations: u32,
    pub delta_threshold: f64,
    pub stop_on_no_high_issues: bool,
    /// Keep iterating past a clean review until `max_iterations`
    pub force_max_iterations: bool,
}

impl Default for FileRoundtableConfig {
    fn default() -> Self {
        let defaults = RoundtableConfig::default();
        Self {
            max_iterations: defaults.max_iterations,
            delta_threshold: defaults.delta_threshold,
            stop_on_no_high_issues: defaults.stop_on_no_high_issues,
            force_max_iterations: false,
        }
    }
}

impl FileRoundtableConfig {
    pub fn to_roundtable_config(&self) -> RoundtableConfig {
        RoundtableConfig::new(self.max_iterations)
            .with_delta_threshold(self.delta_threshold)
            .with_stop_on_no_high_issues(self.stop_on_no_high_issues)
    }

    pub fn to_run_options(&self) -> RunOptions {
        RunOptions::default().with_force_max_iterations(self.force_max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_domain() {
        let config = FileRoundtableConfig::default().to_roundtable_config();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.delta_threshold, 0.05);
        assert!(config.stop_on_no_high_issues);
        assert!(config.custom_stop_condition.is_none());
    }

    #[test]
    fn test_deserialize_roundtable_section() {
        let toml_str = r#"
[roundtable]
max_iterations = 6
force_max_iterations = true
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.roundtable.max_iterations, 6);
        assert_eq!(config.roundtable.delta_threshold, 0.05);
        assert!(config.roundtable.to_run_options().force_max_iterations);
    }
}
