//! Roster from TOML (`[[participants]]` and `[moderator]`)
//!
//! ```toml
//! [[participants]]
//! name = "Security Architect"
//! role = "Threat modelling and data protection"
//! expertise = "OWASP, IAM, cryptography"
//! instructions = "Flag anything that exposes user data."
//!
//! [moderator]
//! focus = "Resolve every High severity issue without adding scope"
//! convergence_criteria = "No reviewer reports a High severity issue"
//! ```
//!
//! With no `[[participants]]`, a product / engineering / AI-risk panel is used.

use roundtable_domain::Persona;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParticipant {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub expertise: String,
    #[serde(default)]
    pub perspective: String,
    pub instructions: String,
}

impl FileParticipant {
    pub fn to_persona(&self) -> Persona {
        Persona::new(&self.name, &self.role, &self.instructions)
            .with_expertise(&self.expertise)
            .with_perspective(&self.perspective)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModeratorConfig {
    pub focus: String,
    pub convergence_criteria: Option<String>,
}

impl Default for FileModeratorConfig {
    fn default() -> Self {
        Self {
            focus: DEFAULT_MODERATOR_FOCUS.to_string(),
            convergence_criteria: None,
        }
    }
}

const DEFAULT_MODERATOR_FOCUS: &str = "\
Fix every High severity issue. Fix Medium issues when they materially improve \
clarity or feasibility. Do not add scope unless an issue requires it. Preserve \
existing strengths, structure and tone.";

/// Panel used when the configuration names no participants
pub fn default_participants() -> Vec<Persona> {
    vec![
        Persona::new(
            "Product Critic",
            "Product quality and clarity",
            "Check the user value proposition, success metrics, scope, acceptance \
             criteria and edge cases. Use High severity for missing core features, \
             unclear success metrics or scope creep.",
        )
        .with_expertise("Product management"),
        Persona::new(
            "Engineering Critic",
            "Technical feasibility",
            "Check feasibility, scalability, security, performance and \
             implementation clarity. Use High severity for architectural flaws, \
             security vulnerabilities or infeasible requirements.",
        )
        .with_expertise("Software architecture"),
        Persona::new(
            "AI Risk Critic",
            "AI safety and evaluation strategy",
            "Check hallucination risk, bias, adversarial robustness, evaluation \
             metrics, monitoring and guardrails. Use High severity for a missing \
             evaluation strategy or inadequate guardrails.",
        )
        .with_expertise("ML evaluation")
        .with_perspective("Assume the model will be wrong some of the time"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_panel_has_unique_names() {
        let panel = default_participants();
        assert_eq!(panel.len(), 3);
        let mut names: Vec<_> = panel.iter().map(|p| p.name.as_str()).collect();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_deserialize_participants() {
        let toml_str = r#"
[[participants]]
name = "Legal"
role = "Compliance"
instructions = "Check GDPR exposure."

[[participants]]
name = "Finance"
role = "Cost"
expertise = "FinOps"
instructions = "Estimate run cost."

[moderator]
convergence_criteria = "Legal signs off"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.participants.len(), 2);
        let finance = config.participants[1].to_persona();
        assert_eq!(finance.name, "Finance");
        assert_eq!(finance.expertise, "FinOps");
        assert_eq!(finance.perspective, "");
        assert_eq!(config.moderator.focus, DEFAULT_MODERATOR_FOCUS);
        assert_eq!(
            config.moderator.convergence_criteria.as_deref(),
            Some("Legal signs off")
        );
    }
}
