//! Document domain
//!
//! Versioned documents and the reviews produced against them.
//!
//! - [`entities::Document`]: one immutable version of the refined text
//! - [`entities::Review`] / [`entities::Issue`]: a single agent's critique
//! - [`severity::Severity`]: High / Medium / Low classification
//! - [`usage::TokenUsage`]: resource usage reported by capabilities

pub mod entities;
pub mod severity;
pub mod usage;
