//! Domain layer for roundtable
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Roundtable
//!
//! A roundtable is an iterative refinement session over a single document:
//!
//! - **Review**: a roster of independent agents critiques the current version
//! - **Refine**: a moderator synthesizes an improved version from all reviews
//! - **Converge**: a rule set decides whether another iteration is worth running
//!
//! ## Versioned Documents
//!
//! Every refinement produces a new [`Document`] with the next version number.
//! Persisted versions are never mutated.

pub mod convergence;
pub mod core;
pub mod document;
pub mod prompt;
pub mod review;
pub mod roundtable;
pub mod session;

// Re-export commonly used types
pub use convergence::{
    count_issues_by_severity, decide, delta::document_delta, delta::similarity_ratio,
    has_high_severity_issues,
};
pub use core::error::{ConfigError, ConvergenceError};
pub use document::{
    entities::{Document, Issue, Review},
    severity::{Severity, SeverityCounts},
    usage::{MODERATOR_USAGE_KEY, TokenUsage, UsageLedger},
};
pub use prompt::PromptTemplate;
pub use review::parsing::{ParseError, parse_review};
pub use roundtable::{
    config::{RoundtableConfig, StopPredicate},
    context::Context,
    decision::{StopDecision, StoppedBy},
    iteration::{Refinement, RoundtableIteration},
    persona::{Persona, RoundtableSnapshot},
};
pub use session::{
    entities::SessionEntry,
    report::{ConvergenceReport, IterationSummary},
};
