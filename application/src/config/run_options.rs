//! Run options: orchestrator loop control.

use serde::{Deserialize, Serialize};

/// Orchestrator options that are not part of the convergence rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Keep iterating after a "no High issues" stop until the ceiling is
    /// reached. Never overrides the ceiling itself.
    pub force_max_iterations: bool,
}

impl RunOptions {
    pub fn with_force_max_iterations(mut self, force: bool) -> Self {
        self.force_max_iterations = force;
        self
    }
}
