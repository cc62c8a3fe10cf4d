//! Roster factory port
//!
//! Turns a persisted [`RoundtableSnapshot`] into live capabilities. Fresh runs
//! and resumed runs go through the same factory, so a resumed session gets
//! the same agents as the run that created it.

use super::agent::{Agent, CapabilityError, Moderator};
use roundtable_domain::RoundtableSnapshot;
use std::sync::Arc;

/// The agents and moderator of one session
#[derive(Clone)]
pub struct Roster {
    pub agents: Vec<Arc<dyn Agent>>,
    pub moderator: Arc<dyn Moderator>,
}

impl Roster {
    pub fn new(agents: Vec<Arc<dyn Agent>>, moderator: Arc<dyn Moderator>) -> Self {
        Self { agents, moderator }
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Roster")
            .field("agents", &self.agent_names())
            .finish_non_exhaustive()
    }
}

pub trait RosterFactory: Send + Sync {
    fn build(&self, snapshot: &RoundtableSnapshot) -> Result<Roster, CapabilityError>;
}
