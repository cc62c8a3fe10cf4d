//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ConfigError`]: invalid roundtable configuration
//! - [`error::ConvergenceError`]: invalid iteration history handed to the decider

pub mod error;
