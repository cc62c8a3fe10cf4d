//! Prompt domain
//!
//! Templates for the two capability calls of a roundtable step: reviewing a
//! document and refining it from the collected reviews.

mod template;

pub use template::PromptTemplate;
