//! Reviewer and moderator capability ports
//!
//! The engine only knows these two traits. Whether a review comes from a
//! language model, a rule set or a scripted test double is an implementation
//! detail.

use super::completion::GatewayError;
use async_trait::async_trait;
use roundtable_domain::{Context, Document, ParseError, Refinement, Review};
use thiserror::Error;

/// Failure of a single capability call
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Unreadable review after {attempts} attempt(s): {source}")]
    Parse {
        attempts: u32,
        #[source]
        source: ParseError,
    },

    #[error("Empty output")]
    EmptyOutput,

    #[error("{0}")]
    Other(String),
}

/// A reviewer seat at the roundtable
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name under which this agent's reviews and usage are recorded
    fn name(&self) -> &str;

    /// Review `document` (read-only) and return a [`Review`]
    async fn review(
        &self,
        document: &Document,
        context: &Context,
    ) -> Result<Review, CapabilityError>;
}

/// Produces refined document content from a document and its reviews
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn refine(
        &self,
        document: &Document,
        reviews: &[Review],
        context: &Context,
    ) -> Result<Refinement, CapabilityError>;
}
