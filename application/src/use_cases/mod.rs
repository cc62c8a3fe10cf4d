//! Use cases (application services)
//!
//! - [`roundtable_engine`]: one review + refine iteration
//! - [`run_roundtable`]: the session loop, fresh and resumed
//! - [`session_registry`]: which sessions currently have a running loop

pub mod roundtable_engine;
pub mod run_roundtable;
pub mod session_registry;
