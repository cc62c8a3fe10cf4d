//! Prompt templates for the roundtable flow

use crate::document::entities::{Document, Review};
use crate::roundtable::context::Context;
use crate::roundtable::persona::Persona;
use serde_json::Value;

/// JSON shape every reviewer is asked to answer with
const REVIEW_FORMAT: &str = r#"Respond with a single JSON object and nothing else:

{
  "issues": [
    {
      "category": "short area name",
      "description": "what is wrong and why it matters",
      "severity": "High | Medium | Low",
      "suggested_fix": "concrete change to make"
    }
  ],
  "overall_assessment": "one or two sentences"
}

Use "High" only for problems that block the document's purpose.
Return an empty "issues" array if you find nothing worth changing."#;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for a reviewing persona
    pub fn review_system(persona: &Persona) -> String {
        let mut prompt = format!(
            "You are {}, reviewing documents at a roundtable of experts.\nYour focus: {}\n",
            persona.name, persona.role
        );
        if !persona.expertise.is_empty() {
            prompt.push_str(&format!("Your expertise: {}\n", persona.expertise));
        }
        if !persona.perspective.is_empty() {
            prompt.push_str(&format!("Your perspective: {}\n", persona.perspective));
        }
        prompt.push('\n');
        prompt.push_str(persona.instructions.trim());
        prompt.push_str("\n\n");
        prompt.push_str(REVIEW_FORMAT);
        prompt
    }

    /// User prompt asking for a review of `document`
    pub fn review_prompt(document: &Document) -> String {
        format!(
            r#"Review the following document:

Title: {}
Version: {}

Content:
{}

Provide your expert review following the instructions in your system prompt.
Focus on your specific area of expertise and flag any issues you identify."#,
            document.title, document.version, document.content
        )
    }

    /// Follow-up prompt after a response could not be parsed
    pub fn review_retry_prompt(document: &Document, error: &str) -> String {
        format!(
            "{}\n\nYour previous answer could not be read ({}). {}",
            Self::review_prompt(document),
            error,
            "Answer with the JSON object only, without any surrounding text."
        )
    }

    /// Shared context appended to review and refine prompts; empty when
    /// there is none
    pub fn context_section(context: &Context) -> String {
        if context.is_empty() {
            return String::new();
        }
        let mut section = String::from("\n\nAdditional context:\n");
        for (key, value) in context {
            match value {
                Value::String(text) => section.push_str(&format!("- {}: {}\n", key, text)),
                other => section.push_str(&format!("- {}: {}\n", key, other)),
            }
        }
        section
    }

    /// System prompt for the moderator
    pub fn moderator_system(focus: &str) -> String {
        format!(
            r#"You are a skilled moderator facilitating a document refinement discussion.

Your job is to take feedback from multiple expert reviewers and create an improved version
of the document that addresses their concerns.

Focus: {}

Guidelines:
- Address ALL High severity issues
- Address Medium issues if they significantly improve quality
- Keep the document focused and concise
- Maintain the original intent while improving clarity
- Preserve the document structure and formatting
- Don't add unnecessary content

Output ONLY the refined document content (markdown format)."#,
            focus
        )
    }

    /// User prompt asking the moderator to refine `document` from `reviews`
    pub fn refine_prompt(document: &Document, reviews: &[Review]) -> String {
        let mut summary = String::new();
        for review in reviews {
            summary.push_str(&format!("\n=== {} ===\n", review.reviewer_name));
            summary.push_str(&format!("Overall: {}\n\n", review.overall_assessment));
            for issue in &review.issues {
                summary.push_str(&format!(
                    "[{}] {}: {}\n",
                    issue.severity, issue.category, issue.description
                ));
                if let Some(fix) = &issue.suggested_fix {
                    summary.push_str(&format!("  -> Suggested fix: {}\n", fix));
                }
            }
        }

        format!(
            r#"Current Document:

Title: {}
Version: {}

Content:
{}

Expert Reviews:
{}
Please create an improved version that addresses the feedback.
Output the complete refined document."#,
            document.title, document.version, document.content, summary
        )
    }
}
