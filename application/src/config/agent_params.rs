//! Agent parameters: persona agent behaviour.
//!
//! [`AgentParams`] is shared by every agent a
//! [`PersonaRosterFactory`](crate::agents::PersonaRosterFactory) builds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Temperature for review completions
    pub review_temperature: f32,
    /// Temperature for moderator completions
    pub refine_temperature: f32,
    /// How many times a reviewer is asked before an unreadable answer fails
    pub max_parse_attempts: u32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            review_temperature: 0.2,
            refine_temperature: 0.3,
            max_parse_attempts: 2,
        }
    }
}

impl AgentParams {
    pub fn with_review_temperature(mut self, temperature: f32) -> Self {
        self.review_temperature = temperature;
        self
    }

    pub fn with_refine_temperature(mut self, temperature: f32) -> Self {
        self.refine_temperature = temperature;
        self
    }

    /// At least one attempt is always made
    pub fn with_max_parse_attempts(mut self, attempts: u32) -> Self {
        self.max_parse_attempts = attempts.max(1);
        self
    }
}
