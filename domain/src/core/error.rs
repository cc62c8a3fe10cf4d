//! Domain error types

use thiserror::Error;

/// Invalid roundtable configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1 (got {0})")]
    InvalidMaxIterations(u32),

    #[error("delta_threshold must be within [0, 1] (got {0})")]
    InvalidDeltaThreshold(f64),

    #[error("roundtable needs at least one participant")]
    NoParticipants,

    #[error("duplicate participant name: {0}")]
    DuplicateParticipant(String),

    #[error("participant name cannot be empty")]
    EmptyParticipantName,
}

/// The convergence decider received an iteration history it cannot reason about
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceError {
    #[error("iteration index must start at 1 or later (got {0})")]
    ZeroIterationIndex(u32),

    #[error("iteration history is not contiguous: expected index {expected}, found {found}")]
    NonContiguousHistory { expected: u32, found: u32 },
}
