//! Stop decisions produced by the convergence decider

use serde::{Deserialize, Serialize};

/// Which rule ended (or did not end) the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedBy {
    NoHighIssues,
    MaxIterations,
    DeltaThreshold,
    Custom,
    None,
}

impl StoppedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoppedBy::NoHighIssues => "no_high_issues",
            StoppedBy::MaxIterations => "max_iterations",
            StoppedBy::DeltaThreshold => "delta_threshold",
            StoppedBy::Custom => "custom",
            StoppedBy::None => "none",
        }
    }
}

impl std::fmt::Display for StoppedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the roundtable should stop, and why
///
/// Reason strings are pure functions of their inputs so decisions are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopDecision {
    pub should_stop: bool,
    pub reason: String,
    pub stopped_by: StoppedBy,
}

impl StopDecision {
    pub fn stop(reason: impl Into<String>, stopped_by: StoppedBy) -> Self {
        Self {
            should_stop: true,
            reason: reason.into(),
            stopped_by,
        }
    }

    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            should_stop: false,
            reason: reason.into(),
            stopped_by: StoppedBy::None,
        }
    }

    /// Nothing has run yet
    pub fn not_started() -> Self {
        Self::proceed("No iterations completed yet")
    }

    pub fn no_high_issues() -> Self {
        Self::stop(
            "No high severity issues remaining (0 remaining)",
            StoppedBy::NoHighIssues,
        )
    }

    pub fn max_iterations(max_iterations: u32, high_remaining: usize) -> Self {
        Self::stop(
            format!(
                "Max iterations reached ({}). {} high severity issues remain.",
                max_iterations, high_remaining
            ),
            StoppedBy::MaxIterations,
        )
    }

    /// `delta` is a fraction in [0, 1]; the reason reports it as a percentage.
    pub fn stable(delta: f64) -> Self {
        Self::stop(
            format!("Document stable (delta: {:.2}%)", delta * 100.0),
            StoppedBy::DeltaThreshold,
        )
    }

    pub fn high_issues_remain(high_remaining: usize) -> Self {
        Self::proceed(format!("{} high severity issues remain", high_remaining))
    }

    /// A custom predicate asked to stop
    pub fn custom(reason: impl Into<String>) -> Self {
        Self::stop(reason, StoppedBy::Custom)
    }

    /// Whether this decision means the run converged, as opposed to being
    /// cut off by the iteration ceiling.
    pub fn is_converged(&self) -> bool {
        self.should_stop && self.stopped_by != StoppedBy::MaxIterations
    }
}
