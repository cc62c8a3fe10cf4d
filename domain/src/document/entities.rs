//! Document entities: versions, reviews and issues

use super::severity::{Severity, SeverityCounts};
use super::usage::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single problem raised by a reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue category (e.g. "Clarity", "Security")
    pub category: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    /// Name of the reviewer that raised this issue
    #[serde(default)]
    pub reviewer: String,
}

impl Issue {
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        reviewer: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            severity,
            suggested_fix: None,
            reviewer: reviewer.into(),
        }
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// One agent's review of one document version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer_name: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub overall_assessment: String,
    pub timestamp: DateTime<Utc>,
    /// Tokens spent producing this review, when the agent reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Review {
    pub fn new(
        reviewer_name: impl Into<String>,
        issues: Vec<Issue>,
        overall_assessment: impl Into<String>,
    ) -> Self {
        Self {
            reviewer_name: reviewer_name.into(),
            issues,
            overall_assessment: overall_assessment.into(),
            timestamp: Utc::now(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn high_severity_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::High)
            .count()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.issues {
            counts.add(issue.severity);
        }
        counts
    }
}

/// One immutable version of the document under refinement
///
/// Versions are assigned by the orchestrator: the initial document is
/// version 1, and [`Document::next_version`] is the only way to derive a
/// successor, so version numbers always grow by exactly one.
///
/// # Example
///
/// ```
/// use roundtable_domain::Document;
///
/// let v1 = Document::initial("API Design", "# Draft", "design");
/// let v2 = v1.next_version("# Draft\n\nWith auth section");
/// assert_eq!(v1.version, 1);
/// assert_eq!(v2.version, 2);
/// assert_eq!(v2.title, "API Design");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub title: String,
    pub content: String,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    /// Reviews attached to this version
    #[serde(default)]
    pub reviews: Vec<Review>,
}

fn default_document_type() -> String {
    "document".to_string()
}

impl Document {
    /// Create version 1 of a document
    pub fn initial(
        title: impl Into<String>,
        content: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            version: 1,
            title: title.into(),
            content: content.into(),
            document_type: document_type.into(),
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
            reviews: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Derive the successor version carrying refined `content`
    ///
    /// Title, type and metadata carry over; reviews do not.
    pub fn next_version(&self, content: impl Into<String>) -> Self {
        Self {
            version: self.version + 1,
            title: self.title.clone(),
            content: content.into(),
            document_type: self.document_type.clone(),
            metadata: self.metadata.clone(),
            created_at: Utc::now(),
            reviews: Vec::new(),
        }
    }

    /// Return a copy of this version with `reviews` attached (for display)
    pub fn with_reviews(mut self, reviews: Vec<Review>) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn issue_counts(&self) -> SeverityCounts {
        crate::convergence::count_issues_by_severity(&self.reviews)
    }
}
