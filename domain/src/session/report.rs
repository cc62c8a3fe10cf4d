//! Convergence report
//!
//! Written exactly once, when the roundtable loop terminates. Its presence in
//! a session is what distinguishes a finished run from a failed or
//! interrupted one.

use crate::document::severity::SeverityCounts;
use crate::document::usage::UsageLedger;
use crate::roundtable::decision::{StopDecision, StoppedBy};
use crate::roundtable::iteration::RoundtableIteration;
use crate::roundtable::persona::Persona;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-iteration entry of the report history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u32,
    /// Version that was reviewed in this iteration
    pub document_version: u32,
    pub issues_count: usize,
    pub severity_counts: SeverityCounts,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tokens: u64,
}

impl IterationSummary {
    pub fn from_iteration(iteration: &RoundtableIteration, document_version: u32) -> Self {
        Self {
            iteration: iteration.iteration_index,
            document_version,
            issues_count: iteration.issue_count(),
            severity_counts: iteration.severity_counts(),
            notes: iteration.notes.clone(),
            tokens: iteration.usage.total(),
        }
    }

    pub fn high_count(&self) -> usize {
        self.severity_counts.high
    }
}

/// Terminal summary of a roundtable run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub session_id: String,
    pub title: String,
    #[serde(default)]
    pub document_type: String,
    pub initial_version: u32,
    pub final_version: u32,
    pub iteration_count: u32,
    pub converged: bool,
    pub convergence_reason: String,
    pub stopped_by: StoppedBy,
    /// Issues raised across every review of every iteration
    pub total_issues_identified: usize,
    /// Severity counts of the last iteration's reviews
    pub final_issue_count: SeverityCounts,
    pub token_usage: UsageLedger,
    pub total_tokens: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Persona>,
    #[serde(default)]
    pub moderator_focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_criteria: Option<String>,
    /// Last completed iteration before a resumed run, if this run resumed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continued_from_iteration: Option<u32>,
    pub history: Vec<IterationSummary>,
}

impl ConvergenceReport {
    /// Outcome of the stop decision recorded in this report
    pub fn decision(&self) -> StopDecision {
        StopDecision {
            should_stop: true,
            reason: self.convergence_reason.clone(),
            stopped_by: self.stopped_by,
        }
    }

    /// Iterations run by this invocation (excludes resumed history)
    pub fn iterations_this_run(&self) -> u32 {
        self.iteration_count
            .saturating_sub(self.continued_from_iteration.unwrap_or(0))
    }
}
