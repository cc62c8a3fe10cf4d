//! Persona agent and moderator over a [`CompletionClient`]

use crate::config::AgentParams;
use crate::ports::agent::{Agent, CapabilityError, Moderator};
use crate::ports::completion::{CompletionClient, CompletionRequest};
use crate::ports::roster::{Roster, RosterFactory};
use async_trait::async_trait;
use roundtable_domain::{
    Context, Document, Persona, PromptTemplate, Refinement, Review, RoundtableSnapshot,
    TokenUsage, parse_review,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reviewer that plays one [`Persona`]
///
/// Unreadable answers are retried with a corrective prompt up to
/// `max_parse_attempts` times before failing with [`CapabilityError::Parse`].
pub struct PersonaAgent {
    persona: Persona,
    client: Arc<dyn CompletionClient>,
    params: AgentParams,
}

impl PersonaAgent {
    pub fn new(persona: Persona, client: Arc<dyn CompletionClient>, params: AgentParams) -> Self {
        Self {
            persona,
            client,
            params,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }
}

#[async_trait]
impl Agent for PersonaAgent {
    fn name(&self) -> &str {
        &self.persona.name
    }

    async fn review(
        &self,
        document: &Document,
        context: &Context,
    ) -> Result<Review, CapabilityError> {
        let system = PromptTemplate::review_system(&self.persona);
        let context_section = PromptTemplate::context_section(context);
        let max_attempts = self.params.max_parse_attempts.max(1);

        let mut prompt = PromptTemplate::review_prompt(document);
        let mut usage = TokenUsage::default();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = CompletionRequest::new(&system, format!("{}{}", prompt, context_section))
                .with_temperature(self.params.review_temperature);

            debug!(
                agent = %self.persona.name,
                attempt,
                model = self.client.model(),
                "Requesting review"
            );
            let completion = self.client.complete(&request).await?;
            if let Some(u) = completion.usage {
                usage += u;
            }

            match parse_review(&completion.text, &self.persona.name) {
                Ok(review) => {
                    debug!(
                        agent = %self.persona.name,
                        issues = review.issues.len(),
                        high = review.high_severity_count(),
                        "Review parsed"
                    );
                    return Ok(if usage.is_empty() {
                        review
                    } else {
                        review.with_usage(usage)
                    });
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        agent = %self.persona.name,
                        attempt,
                        "Unreadable review, asking again: {}",
                        e
                    );
                    prompt = PromptTemplate::review_retry_prompt(document, &e.to_string());
                }
                Err(e) => {
                    return Err(CapabilityError::Parse {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Moderator that refines toward a configured focus
pub struct PersonaModerator {
    focus: String,
    client: Arc<dyn CompletionClient>,
    params: AgentParams,
}

impl PersonaModerator {
    pub fn new(
        focus: impl Into<String>,
        client: Arc<dyn CompletionClient>,
        params: AgentParams,
    ) -> Self {
        Self {
            focus: focus.into(),
            client,
            params,
        }
    }

    /// Focus string as built from the snapshot (including convergence criteria)
    pub fn focus(&self) -> &str {
        &self.focus
    }
}

#[async_trait]
impl Moderator for PersonaModerator {
    async fn refine(
        &self,
        document: &Document,
        reviews: &[Review],
        context: &Context,
    ) -> Result<Refinement, CapabilityError> {
        let request = CompletionRequest::new(
            PromptTemplate::moderator_system(&self.focus),
            format!(
                "{}{}",
                PromptTemplate::refine_prompt(document, reviews),
                PromptTemplate::context_section(context)
            ),
        )
        .with_temperature(self.params.refine_temperature);

        debug!(
            version = document.version,
            reviews = reviews.len(),
            "Requesting refinement"
        );
        let completion = self.client.complete(&request).await?;

        let content = completion.text.trim();
        if content.is_empty() {
            return Err(CapabilityError::EmptyOutput);
        }

        let refinement = Refinement::new(content);
        Ok(match completion.usage {
            Some(usage) => refinement.with_usage(usage),
            None => refinement,
        })
    }
}

/// Builds persona agents and a moderator for a snapshot over one client
pub struct PersonaRosterFactory {
    client: Arc<dyn CompletionClient>,
    params: AgentParams,
}

impl PersonaRosterFactory {
    pub fn new(client: Arc<dyn CompletionClient>, params: AgentParams) -> Self {
        Self { client, params }
    }
}

impl RosterFactory for PersonaRosterFactory {
    fn build(&self, snapshot: &RoundtableSnapshot) -> Result<Roster, CapabilityError> {
        if snapshot.participants.is_empty() {
            return Err(CapabilityError::Other(
                "roster has no participants".to_string(),
            ));
        }

        let agents = snapshot
            .participants
            .iter()
            .map(|persona| {
                Arc::new(PersonaAgent::new(
                    persona.clone(),
                    Arc::clone(&self.client),
                    self.params.clone(),
                )) as Arc<dyn Agent>
            })
            .collect();

        let focus = match &snapshot.convergence_criteria {
            Some(criteria) => format!(
                "{}\nThe discussion is finished when: {}",
                snapshot.moderator_focus, criteria
            ),
            None => snapshot.moderator_focus.clone(),
        };
        let moderator = Arc::new(PersonaModerator::new(
            focus,
            Arc::clone(&self.client),
            self.params.clone(),
        ));

        Ok(Roster::new(agents, moderator))
    }
}
