//! Roundtable domain
//!
//! Value types describing one refinement session and its iterations.
//!
//! ```text
//!   Document vN ──► agents review (concurrently) ──► moderator refines ──► Document vN+1
//!        ▲                                                                      │
//!        └──────────────── convergence decider says "continue" ◄────────────────┘
//! ```
//!
//! - [`config::RoundtableConfig`]: loop limits and stop rules
//! - [`iteration::RoundtableIteration`]: the outcome of one review + refine step
//! - [`decision::StopDecision`]: what the convergence decider concluded
//! - [`persona::RoundtableSnapshot`]: the roster persisted for resumption

pub mod config;
pub mod context;
pub mod decision;
pub mod iteration;
pub mod persona;
