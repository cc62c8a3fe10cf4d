//! Application layer for roundtable
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod agents;
pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use agents::{PersonaAgent, PersonaModerator, PersonaRosterFactory};
pub use config::{AgentParams, RunOptions};
pub use ports::{
    agent::{Agent, CapabilityError, Moderator},
    completion::{Completion, CompletionClient, CompletionRequest, GatewayError},
    event_sink::{CompositeEventSink, EventSink, NoEventSink, RoundtableEvent},
    roster::{Roster, RosterFactory},
    session_store::{SessionStore, StorageError},
};
pub use use_cases::roundtable_engine::{AgentError, EngineError, RoundtableEngine};
pub use use_cases::run_roundtable::{
    Orchestrator, OrchestratorError, RoundtableOutcome, RunRoundtableInput,
};
pub use use_cases::session_registry::{ActiveSessionGuard, SessionRegistry};
