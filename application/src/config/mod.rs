//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`RunOptions`]: loop control beyond the domain stop rules
//! - [`AgentParams`]: sampling and parsing policy of persona agents

pub mod agent_params;
pub mod run_options;

pub use agent_params::AgentParams;
pub use run_options::RunOptions;
