//! Session domain
//!
//! - [`entities::SessionEntry`]: one row of the session index
//! - [`report::ConvergenceReport`]: the terminal summary written once per run

pub mod entities;
pub mod report;
