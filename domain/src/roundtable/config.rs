//! Roundtable loop configuration

use super::iteration::RoundtableIteration;
use crate::core::error::ConfigError;
use std::sync::Arc;

/// Caller-defined stop rule evaluated over the iteration history
///
/// Returns `Some(reason)` to stop the loop, `None` to keep going. When a
/// predicate is configured, its answer replaces every built-in rule.
pub type StopPredicate = Arc<dyn Fn(&[RoundtableIteration]) -> Option<String> + Send + Sync>;

/// Limits and stop rules for one roundtable run
///
/// # Example
///
/// ```
/// use roundtable_domain::RoundtableConfig;
///
/// let config = RoundtableConfig::new(5).with_delta_threshold(0.02);
/// assert!(config.validate().is_ok());
/// assert!(RoundtableConfig::new(0).validate().is_err());
/// ```
#[derive(Clone)]
pub struct RoundtableConfig {
    /// Iteration ceiling (at least 1)
    pub max_iterations: u32,
    /// Stop once consecutive outputs differ by less than this fraction
    pub delta_threshold: f64,
    /// Stop as soon as an iteration reports no High-severity issue
    pub stop_on_no_high_issues: bool,
    pub custom_stop_condition: Option<StopPredicate>,
}

impl Default for RoundtableConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            delta_threshold: 0.05,
            stop_on_no_high_issues: true,
            custom_stop_condition: None,
        }
    }
}

impl RoundtableConfig {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_delta_threshold(mut self, delta_threshold: f64) -> Self {
        self.delta_threshold = delta_threshold;
        self
    }

    pub fn with_stop_on_no_high_issues(mut self, enabled: bool) -> Self {
        self.stop_on_no_high_issues = enabled;
        self
    }

    pub fn with_custom_stop_condition<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[RoundtableIteration]) -> Option<String> + Send + Sync + 'static,
    {
        self.custom_stop_condition = Some(Arc::new(predicate));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations < 1 {
            return Err(ConfigError::InvalidMaxIterations(self.max_iterations));
        }
        if !(0.0..=1.0).contains(&self.delta_threshold) {
            return Err(ConfigError::InvalidDeltaThreshold(self.delta_threshold));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RoundtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundtableConfig")
            .field("max_iterations", &self.max_iterations)
            .field("delta_threshold", &self.delta_threshold)
            .field("stop_on_no_high_issues", &self.stop_on_no_high_issues)
            .field(
                "custom_stop_condition",
                &self.custom_stop_condition.as_ref().map(|_| "<predicate>"),
            )
            .finish()
    }
}
