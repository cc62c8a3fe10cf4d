//! Review domain
//!
//! Turning free-form reviewer output into structured [`Review`](crate::Review)
//! records.

pub mod parsing;
