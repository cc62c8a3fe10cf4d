//! Participant personas and the persisted roster snapshot
//!
//! Every reviewer is described by data, not by type: one [`Persona`] record
//! per seat at the table. The [`RoundtableSnapshot`] is saved once per
//! session so a run can be resumed with the same roster and loop flags.

use super::context::Context;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A reviewer seat at the roundtable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, unique within a roster (e.g. "Security Architect")
    pub name: String,
    /// What this participant reviews for
    pub role: String,
    #[serde(default)]
    pub expertise: String,
    #[serde(default)]
    pub perspective: String,
    /// Complete reviewing instructions for this participant
    pub instructions: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            expertise: String::new(),
            perspective: String::new(),
            instructions: instructions.into(),
        }
    }

    pub fn with_expertise(mut self, expertise: impl Into<String>) -> Self {
        self.expertise = expertise.into();
        self
    }

    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = perspective.into();
        self
    }
}

/// Roster and moderator configuration of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundtableSnapshot {
    pub participants: Vec<Persona>,
    /// What the moderator concentrates on when refining
    pub moderator_focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_criteria: Option<String>,
    /// Context handed to every capability call
    #[serde(default)]
    pub context: Context,
    /// Kind of document under refinement, e.g. "prd"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    /// Keep iterating after a review round without High issues, up to the
    /// ceiling. Restored when the session is resumed.
    #[serde(default)]
    pub force_max_iterations: bool,
}

impl RoundtableSnapshot {
    pub fn new(participants: Vec<Persona>, moderator_focus: impl Into<String>) -> Self {
        Self {
            participants,
            moderator_focus: moderator_focus.into(),
            convergence_criteria: None,
            context: Context::new(),
            document_type: None,
            force_max_iterations: false,
        }
    }

    pub fn with_convergence_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.convergence_criteria = Some(criteria.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn with_force_max_iterations(mut self, force: bool) -> Self {
        self.force_max_iterations = force;
        self
    }

    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.name.as_str()).collect()
    }

    /// The roster must be non-empty with unique, non-blank names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.participants.is_empty() {
            return Err(ConfigError::NoParticipants);
        }
        let mut seen = HashSet::new();
        for persona in &self.participants {
            if persona.name.trim().is_empty() {
                return Err(ConfigError::EmptyParticipantName);
            }
            if !seen.insert(persona.name.as_str()) {
                return Err(ConfigError::DuplicateParticipant(persona.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(names: &[&str]) -> RoundtableSnapshot {
        RoundtableSnapshot::new(
            names
                .iter()
                .map(|n| Persona::new(*n, "review", "be thorough"))
                .collect(),
            "Fix all High issues",
        )
    }

    #[test]
    fn test_validate_roster() {
        assert!(snapshot(&["Product", "Engineering"]).validate().is_ok());
        assert_eq!(snapshot(&[]).validate(), Err(ConfigError::NoParticipants));
        assert_eq!(
            snapshot(&["Product", "Product"]).validate(),
            Err(ConfigError::DuplicateParticipant("Product".to_string()))
        );
        assert_eq!(
            snapshot(&["  "]).validate(),
            Err(ConfigError::EmptyParticipantName)
        );
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let mut context = Context::new();
        context.insert("goal".to_string(), serde_json::json!("ship v1"));
        let original = snapshot(&["Security"])
            .with_convergence_criteria("No High issues")
            .with_context(context)
            .with_document_type("prd")
            .with_force_max_iterations(true);

        let json = serde_json::to_string(&original).unwrap();
        let back: RoundtableSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert_eq!(back.participant_names(), vec!["Security"]);
        assert!(back.force_max_iterations);
    }

    #[test]
    fn test_snapshot_without_run_flags_deserializes() {
        let json = r#"{"participants": [], "moderator_focus": "focus"}"#;
        let snapshot: RoundtableSnapshot = serde_json::from_str(json).unwrap();
        assert!(!snapshot.force_max_iterations);
        assert_eq!(snapshot.document_type, None);
    }
}
