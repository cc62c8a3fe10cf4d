//! Roundtable engine
//!
//! Executes one iteration: every agent reviews the current document
//! concurrently, then the moderator refines it from the complete review set.
//!
//! ```text
//!            document vN
//!                 |
//!     +-----------+-----------+        one task per agent
//!     |           |           |
//!  agent A     agent B     agent C     (JoinSet, wait for all)
//!     |           |           |
//!     +-----------+-----------+
//!                 |  complete review set
//!             moderator
//!                 |
//!          refined content  →  RoundtableIteration
//! ```
//!
//! Any agent failure aborts the iteration: the remaining review tasks are
//! cancelled and the moderator never sees a partial review set. The engine
//! never touches storage.

use crate::ports::agent::{Agent, CapabilityError, Moderator};
use crate::ports::event_sink::{EventSink, NoEventSink, RoundtableEvent, names};
use roundtable_domain::{
    Context, Document, MODERATOR_USAGE_KEY, Review, RoundtableIteration, UsageLedger,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A review call that failed, with the agent it belongs to
#[derive(Error, Debug)]
#[error("Agent '{agent}' failed: {source}")]
pub struct AgentError {
    pub agent: String,
    #[source]
    pub source: CapabilityError,
}

/// Errors that abort a roundtable step
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No agents configured")]
    NoAgents,

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Moderator failed: {0}")]
    Moderator(#[source] CapabilityError),

    #[error("Review task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    /// Name of the capability that failed, if one did
    pub fn failed_capability(&self) -> Option<&str> {
        match self {
            EngineError::Agent(e) => Some(e.agent.as_str()),
            EngineError::Moderator(_) => Some(MODERATOR_USAGE_KEY),
            _ => None,
        }
    }
}

/// Executes single roundtable iterations
#[derive(Debug, Clone, Default)]
pub struct RoundtableEngine;

impl RoundtableEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run one review + refine step without event reporting
    pub async fn step(
        &self,
        document: &Document,
        agents: &[Arc<dyn Agent>],
        moderator: &Arc<dyn Moderator>,
        context: &Context,
        iteration_index: u32,
    ) -> Result<RoundtableIteration, EngineError> {
        self.step_with_events(
            document,
            agents,
            moderator,
            context,
            iteration_index,
            &NoEventSink,
        )
        .await
    }

    /// Run one review + refine step, emitting agent and moderator events
    pub async fn step_with_events(
        &self,
        document: &Document,
        agents: &[Arc<dyn Agent>],
        moderator: &Arc<dyn Moderator>,
        context: &Context,
        iteration_index: u32,
        events: &dyn EventSink,
    ) -> Result<RoundtableIteration, EngineError> {
        if agents.is_empty() {
            return Err(EngineError::NoAgents);
        }

        info!(
            iteration = iteration_index,
            version = document.version,
            agents = agents.len(),
            "Starting roundtable step"
        );

        let reviews = self
            .collect_reviews(document, agents, context, iteration_index, events)
            .await?;

        self.refine_with_events(document, reviews, moderator, context, iteration_index, events)
            .await
    }

    /// Refine phase only, over a review set collected earlier
    ///
    /// Used when a session is resumed after its reviews for `document` were
    /// already persisted.
    pub async fn refine_with_events(
        &self,
        document: &Document,
        reviews: Vec<Review>,
        moderator: &Arc<dyn Moderator>,
        context: &Context,
        iteration_index: u32,
        events: &dyn EventSink,
    ) -> Result<RoundtableIteration, EngineError> {
        let mut usage = UsageLedger::new();
        for review in &reviews {
            if let Some(u) = &review.usage {
                usage.record(review.reviewer_name.clone(), u);
            }
        }

        events.emit(RoundtableEvent::new(
            names::MODERATOR_START,
            json!({
                "iteration": iteration_index,
                "version": document.version,
                "review_count": reviews.len(),
            }),
        ));

        let refinement = moderator
            .refine(document, &reviews, context)
            .await
            .map_err(|e| {
                warn!(iteration = iteration_index, "Moderator failed: {}", e);
                EngineError::Moderator(e)
            })?;

        if let Some(u) = &refinement.usage {
            usage.record(MODERATOR_USAGE_KEY, u);
        }

        events.emit(RoundtableEvent::new(
            names::MODERATOR_COMPLETE,
            json!({
                "iteration": iteration_index,
                "new_version": document.version + 1,
                "tokens": refinement.usage.map(|u| u.total_tokens).unwrap_or(0),
            }),
        ));

        let high = reviews.iter().map(Review::high_severity_count).sum::<usize>();
        let notes = format!(
            "{} review(s), {} high severity issue(s)",
            reviews.len(),
            high
        );
        debug!(iteration = iteration_index, "{}", notes);

        Ok(
            RoundtableIteration::new(
                iteration_index,
                document.content.clone(),
                refinement.content,
                reviews,
            )
            .with_notes(notes)
            .with_usage(usage),
        )
    }

    /// Review phase: one task per agent, all joined before returning
    ///
    /// Reviews come back in roster order regardless of completion order.
    async fn collect_reviews(
        &self,
        document: &Document,
        agents: &[Arc<dyn Agent>],
        context: &Context,
        iteration_index: u32,
        events: &dyn EventSink,
    ) -> Result<Vec<Review>, EngineError> {
        let document = Arc::new(document.clone());
        let context = Arc::new(context.clone());
        let mut join_set = JoinSet::new();

        for (index, agent) in agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let document = Arc::clone(&document);
            let context = Arc::clone(&context);

            events.emit(RoundtableEvent::new(
                names::AGENT_REVIEW_START,
                json!({ "iteration": iteration_index, "agent": agent.name() }),
            ));

            join_set.spawn(async move {
                let result = agent.review(&document, &context).await;
                (index, agent.name().to_string(), result)
            });
        }

        let mut slots: Vec<Option<Review>> = vec![None; agents.len()];

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, name, Ok(review))) => {
                    info!(
                        iteration = iteration_index,
                        agent = %name,
                        issues = review.issues.len(),
                        high = review.high_severity_count(),
                        "Review complete"
                    );
                    events.emit(RoundtableEvent::new(
                        names::AGENT_REVIEW_COMPLETE,
                        json!({
                            "iteration": iteration_index,
                            "agent": name,
                            "issues": review.issues.len(),
                            "high": review.high_severity_count(),
                            "tokens": review.usage.map(|u| u.total_tokens).unwrap_or(0),
                        }),
                    ));
                    slots[index] = Some(review);
                }
                Ok((_, name, Err(source))) => {
                    warn!(iteration = iteration_index, agent = %name, "Review failed: {}", source);
                    join_set.abort_all();
                    return Err(AgentError { agent: name, source }.into());
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                    join_set.abort_all();
                    return Err(EngineError::TaskFailed(e.to_string()));
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EngineError::TaskFailed("review task produced no result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roundtable_domain::{Issue, Refinement, Severity, TokenUsage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct FixedAgent {
        name: String,
        severities: Vec<Severity>,
        delay: Duration,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FixedAgent {
        fn new(name: &str, severities: &[Severity]) -> Self {
            Self {
                name: name.to_string(),
                severities: severities.to_vec(),
                delay: Duration::ZERO,
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn delayed(mut self, millis: u64) -> Self {
            self.delay = Duration::from_millis(millis);
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl Agent for FixedAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn review(
            &self,
            _document: &Document,
            _context: &Context,
        ) -> Result<Review, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(CapabilityError::Other("model unavailable".to_string()));
            }
            let issues = self
                .severities
                .iter()
                .map(|s| Issue::new("cat", "desc", *s, &self.name))
                .collect();
            Ok(Review::new(&self.name, issues, "ok").with_usage(TokenUsage::new(10, 5)))
        }
    }

    /// Appends a marker and records how many reviews it was given
    struct AppendingModerator {
        seen_reviews: Mutex<Vec<usize>>,
        fail: bool,
    }

    impl AppendingModerator {
        fn new() -> Self {
            Self {
                seen_reviews: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Moderator for AppendingModerator {
        async fn refine(
            &self,
            document: &Document,
            reviews: &[Review],
            _context: &Context,
        ) -> Result<Refinement, CapabilityError> {
            self.seen_reviews.lock().unwrap().push(reviews.len());
            if self.fail {
                return Err(CapabilityError::EmptyOutput);
            }
            Ok(Refinement::new(format!("{}\n(refined)", document.content))
                .with_usage(TokenUsage::new(100, 50)))
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<&'static str>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: RoundtableEvent) {
            self.0.lock().unwrap().push(event.name);
        }
    }

    fn doc() -> Document {
        Document::initial("Doc", "body", "document")
    }

    #[tokio::test]
    async fn test_step_collects_all_reviews_before_refining() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(FixedAgent::new("Slow", &[Severity::High]).delayed(30)),
            Arc::new(FixedAgent::new("Fast", &[Severity::Low, Severity::Medium])),
        ];
        let moderator = Arc::new(AppendingModerator::new());
        let moderator_dyn: Arc<dyn Moderator> = moderator.clone();

        let iteration = RoundtableEngine::new()
            .step(&doc(), &agents, &moderator_dyn, &Context::new(), 1)
            .await
            .unwrap();

        assert_eq!(*moderator.seen_reviews.lock().unwrap(), vec![2]);
        assert_eq!(iteration.iteration_index, 1);
        assert_eq!(iteration.input_document, "body");
        assert_eq!(iteration.output_document, "body\n(refined)");
        // roster order, not completion order
        let reviewers: Vec<_> = iteration
            .reviews
            .iter()
            .map(|r| r.reviewer_name.as_str())
            .collect();
        assert_eq!(reviewers, vec!["Slow", "Fast"]);
        assert_eq!(iteration.high_severity_count(), 1);
        assert_eq!(iteration.usage.get("Slow"), 15);
        assert_eq!(iteration.usage.get(MODERATOR_USAGE_KEY), 150);
        assert_eq!(iteration.usage.total(), 180);
    }

    #[tokio::test]
    async fn test_step_runs_agents_concurrently() {
        let agents: Vec<Arc<dyn Agent>> = (0..4)
            .map(|i| {
                Arc::new(FixedAgent::new(&format!("A{}", i), &[]).delayed(200)) as Arc<dyn Agent>
            })
            .collect();
        let moderator: Arc<dyn Moderator> = Arc::new(AppendingModerator::new());

        let started = std::time::Instant::now();
        RoundtableEngine::new()
            .step(&doc(), &agents, &moderator, &Context::new(), 1)
            .await
            .unwrap();
        // sequential execution would take at least 800ms
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_agent_failure_aborts_step_without_moderator() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(FixedAgent::new("Good", &[Severity::High])),
            Arc::new(FixedAgent::new("Broken", &[]).failing()),
        ];
        let moderator = Arc::new(AppendingModerator::new());
        let moderator_dyn: Arc<dyn Moderator> = moderator.clone();

        let err = RoundtableEngine::new()
            .step(&doc(), &agents, &moderator_dyn, &Context::new(), 2)
            .await
            .unwrap_err();

        match &err {
            EngineError::Agent(e) => {
                assert_eq!(e.agent, "Broken");
                assert!(e.source.to_string().contains("model unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.failed_capability(), Some("Broken"));
        assert!(moderator.seen_reviews.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_moderator_failure_is_reported() {
        let agents: Vec<Arc<dyn Agent>> = vec![Arc::new(FixedAgent::new("A", &[]))];
        let moderator: Arc<dyn Moderator> = Arc::new(AppendingModerator {
            seen_reviews: Mutex::new(Vec::new()),
            fail: true,
        });

        let err = RoundtableEngine::new()
            .step(&doc(), &agents, &moderator, &Context::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Moderator(CapabilityError::EmptyOutput)));
        assert_eq!(err.failed_capability(), Some(MODERATOR_USAGE_KEY));
    }

    #[tokio::test]
    async fn test_refine_only_reuses_collected_reviews() {
        let moderator = Arc::new(AppendingModerator::new());
        let moderator_dyn: Arc<dyn Moderator> = moderator.clone();
        let reviews = vec![
            Review::new("Earlier", vec![Issue::new("cat", "desc", Severity::High, "Earlier")], "")
                .with_usage(TokenUsage::new(8, 2)),
        ];
        let sink = RecordingSink::default();

        let iteration = RoundtableEngine::new()
            .refine_with_events(&doc(), reviews, &moderator_dyn, &Context::new(), 4, &sink)
            .await
            .unwrap();

        assert_eq!(iteration.iteration_index, 4);
        assert_eq!(iteration.high_severity_count(), 1);
        assert_eq!(iteration.output_document, "body\n(refined)");
        assert_eq!(iteration.usage.get("Earlier"), 10);
        assert_eq!(iteration.usage.get(MODERATOR_USAGE_KEY), 150);
        assert_eq!(*moderator.seen_reviews.lock().unwrap(), vec![1]);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![names::MODERATOR_START, names::MODERATOR_COMPLETE]
        );
    }

    #[tokio::test]
    async fn test_no_agents() {
        let moderator: Arc<dyn Moderator> = Arc::new(AppendingModerator::new());
        let err = RoundtableEngine::new()
            .step(&doc(), &[], &moderator, &Context::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoAgents));
    }

    #[tokio::test]
    async fn test_step_emits_events_in_phase_order() {
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(FixedAgent::new("A", &[])),
            Arc::new(FixedAgent::new("B", &[])),
        ];
        let moderator: Arc<dyn Moderator> = Arc::new(AppendingModerator::new());
        let sink = RecordingSink::default();

        RoundtableEngine::new()
            .step_with_events(&doc(), &agents, &moderator, &Context::new(), 1, &sink)
            .await
            .unwrap();

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                names::AGENT_REVIEW_START,
                names::AGENT_REVIEW_START,
                names::AGENT_REVIEW_COMPLETE,
                names::AGENT_REVIEW_COMPLETE,
                names::MODERATOR_START,
                names::MODERATOR_COMPLETE,
            ]
        );
    }
}
