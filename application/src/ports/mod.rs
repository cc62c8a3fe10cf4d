//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent;
pub mod completion;
pub mod event_sink;
pub mod roster;
pub mod session_store;
