//! Capability implementations driven by persona records
//!
//! One concrete [`Agent`](crate::ports::agent::Agent) and one
//! [`Moderator`](crate::ports::agent::Moderator), configured by data. Every
//! seat at the table is a [`PersonaAgent`] with a different [`Persona`](roundtable_domain::Persona).

pub mod persona;

pub use persona::{PersonaAgent, PersonaModerator, PersonaRosterFactory};
