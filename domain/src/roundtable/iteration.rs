//! The outcome of one roundtable step

use crate::document::entities::{Issue, Review};
use crate::document::severity::{Severity, SeverityCounts};
use crate::document::usage::{TokenUsage, UsageLedger};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// New document content produced by a moderator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Refinement {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// One full review + refine step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundtableIteration {
    /// 1-based position in the session
    pub iteration_index: u32,
    pub input_document: String,
    pub output_document: String,
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Tokens spent in this step, per participant
    #[serde(default)]
    pub usage: UsageLedger,
}

impl RoundtableIteration {
    pub fn new(
        iteration_index: u32,
        input_document: impl Into<String>,
        output_document: impl Into<String>,
        reviews: Vec<Review>,
    ) -> Self {
        Self {
            iteration_index,
            input_document: input_document.into(),
            output_document: output_document.into(),
            reviews,
            notes: String::new(),
            metadata: BTreeMap::new(),
            usage: UsageLedger::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_usage(mut self, usage: UsageLedger) -> Self {
        self.usage = usage;
        self
    }

    /// All issues from all reviews, in review order
    pub fn all_issues(&self) -> impl Iterator<Item = &Issue> {
        self.reviews.iter().flat_map(|r| r.issues.iter())
    }

    pub fn issue_count(&self) -> usize {
        self.all_issues().count()
    }

    pub fn high_severity_count(&self) -> usize {
        self.all_issues()
            .filter(|i| i.severity == Severity::High)
            .count()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        crate::convergence::count_issues_by_severity(&self.reviews)
    }
}
