//! Run Roundtable use case
//!
//! Drives the full refinement loop for one session:
//!
//! ```text
//! create session ─► save v1 + roster snapshot
//!        │
//!        ▼
//! ┌─► engine.step(vN) ─► save reviews(vN) ─► decide(history)
//! │                                              │
//! │                 stop ◄───────────────────────┤
//! │                  │                           │ continue
//! │                  ▼                           ▼
//! │            save report              save v(N+1)
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A session is marked active in the [`SessionRegistry`] for the whole loop.
//! The convergence report is written when the loop ends; a session without
//! one either failed or is still running. [`Orchestrator::continue_from`]
//! resumes such a session, or extends a finished one under a higher
//! `max_iterations`, in which case the new report supersedes the old one.

use crate::config::RunOptions;
use crate::ports::agent::CapabilityError;
use crate::ports::event_sink::{EventSink, NoEventSink, RoundtableEvent, names};
use crate::ports::roster::{Roster, RosterFactory};
use crate::ports::session_store::{SessionStore, StorageError};
use crate::use_cases::roundtable_engine::{EngineError, RoundtableEngine};
use crate::use_cases::session_registry::{ActiveSessionGuard, SessionRegistry};
use chrono::{DateTime, Utc};
use roundtable_domain::{
    ConfigError, ConvergenceError, ConvergenceReport, Document, IterationSummary, Review,
    RoundtableConfig, RoundtableIteration, RoundtableSnapshot, StopDecision, StoppedBy,
    UsageLedger, decide, has_high_severity_issues,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end a roundtable run
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Could not build roster: {0}")]
    Roster(#[source] CapabilityError),

    #[error("Session {session_id}: iteration {iteration} failed: {source}")]
    Iteration {
        session_id: String,
        iteration: u32,
        #[source]
        source: EngineError,
    },

    #[error("Convergence check failed: {0}")]
    Convergence(#[from] ConvergenceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session {0} is already running")]
    SessionActive(String),

    #[error(
        "Session {0} already converged with no High-severity issues; set force_max_iterations to keep refining"
    )]
    AlreadyConverged(String),

    #[error("Session {0} has no saved roundtable configuration")]
    MissingRoundtableConfig(String),

    #[error("Session {session_id} is inconsistent: {detail}")]
    InconsistentSession { session_id: String, detail: String },

    #[error(
        "Session {session_id} already completed {completed} iteration(s); raise max_iterations above {max_iterations} to continue"
    )]
    NothingToResume {
        session_id: String,
        completed: u32,
        max_iterations: u32,
    },
}

/// Input for a fresh roundtable run
#[derive(Debug, Clone)]
pub struct RunRoundtableInput {
    pub title: String,
    /// Content of document version 1
    pub content: String,
    pub document_type: String,
    pub metadata: BTreeMap<String, Value>,
    /// Roster and moderator focus, persisted for resumption
    pub snapshot: RoundtableSnapshot,
    pub config: RoundtableConfig,
}

impl RunRoundtableInput {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        snapshot: RoundtableSnapshot,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            document_type: "document".to_string(),
            metadata: BTreeMap::new(),
            snapshot,
            config: RoundtableConfig::default(),
        }
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = document_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_config(mut self, config: RoundtableConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RoundtableOutcome {
    pub session_id: String,
    /// Last reviewed version, with its reviews attached
    pub final_document: Document,
    /// Every iteration of the session, including resumed history
    pub iterations: Vec<RoundtableIteration>,
    pub decision: StopDecision,
    pub report: ConvergenceReport,
}

/// State of one session while its loop runs
struct SessionRun {
    session_id: String,
    snapshot: RoundtableSnapshot,
    roster: Roster,
    config: RoundtableConfig,
    document: Document,
    history: Vec<RoundtableIteration>,
    started_at: DateTime<Utc>,
    continued_from: Option<u32>,
    /// Persisted reviews of `document` whose refinement was never kept
    restored_reviews: Option<Vec<Review>>,
    /// The session already has a report that this run replaces
    supersedes_report: bool,
}

/// Use case for running and resuming roundtable sessions
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    roster_factory: Arc<dyn RosterFactory>,
    registry: SessionRegistry,
    engine: RoundtableEngine,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        roster_factory: Arc<dyn RosterFactory>,
        registry: SessionRegistry,
    ) -> Self {
        Self {
            store,
            roster_factory,
            registry,
            engine: RoundtableEngine::new(),
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Start a new session with default (no-op) events
    pub async fn run(
        &self,
        input: RunRoundtableInput,
    ) -> Result<RoundtableOutcome, OrchestratorError> {
        self.run_with_events(input, &NoEventSink).await
    }

    /// Start a new session, reporting lifecycle events to `events`
    pub async fn run_with_events(
        &self,
        input: RunRoundtableInput,
        events: &dyn EventSink,
    ) -> Result<RoundtableOutcome, OrchestratorError> {
        input.config.validate()?;
        input.snapshot.validate()?;
        // persisted so a resumed run keeps the same loop flags
        let force = input.snapshot.force_max_iterations || self.options.force_max_iterations;
        let snapshot = input
            .snapshot
            .with_document_type(&input.document_type)
            .with_force_max_iterations(force);
        let roster = self
            .roster_factory
            .build(&snapshot)
            .map_err(OrchestratorError::Roster)?;

        let session_id = self.store.create_session(&input.title).await?;
        let guard = self
            .registry
            .try_activate(&session_id)
            .ok_or_else(|| OrchestratorError::SessionActive(session_id.clone()))?;

        info!(
            session_id = %session_id,
            title = %input.title,
            participants = roster.agents.len(),
            max_iterations = input.config.max_iterations,
            "Starting roundtable"
        );

        let document = Document::initial(&input.title, &input.content, &input.document_type)
            .with_metadata(input.metadata);
        self.store.save_document(&session_id, &document).await?;
        self.store.save_config(&session_id, &snapshot).await?;

        events.emit(RoundtableEvent::new(
            names::SESSION_CREATED,
            json!({
                "session_id": session_id,
                "title": input.title,
                "document_type": input.document_type,
                "participants": snapshot.participant_names(),
                "max_iterations": input.config.max_iterations,
            }),
        ));

        let run = SessionRun {
            session_id,
            snapshot,
            roster,
            config: input.config,
            document,
            history: Vec::new(),
            started_at: Utc::now(),
            continued_from: None,
            restored_reviews: None,
            supersedes_report: false,
        };
        self.drive(run, &guard, events).await
    }

    /// Resume or extend a session with default (no-op) events
    pub async fn continue_from(
        &self,
        session_id: &str,
        config: RoundtableConfig,
    ) -> Result<RoundtableOutcome, OrchestratorError> {
        self.continue_from_with_events(session_id, config, &NoEventSink)
            .await
    }

    /// Resume a session at the iteration after its last persisted one
    ///
    /// Works for failed runs and for finished runs under a higher
    /// `max_iterations`. The roster is rebuilt from the session's saved
    /// snapshot, the run flags saved with it still apply, and the decider
    /// sees the full reconstructed history, so the run behaves like a
    /// continuous run with the new `max_iterations`.
    ///
    /// A finished run's last version already has its reviews; that iteration
    /// is completed by refining with those reviews instead of reviewing again.
    pub async fn continue_from_with_events(
        &self,
        session_id: &str,
        config: RoundtableConfig,
        events: &dyn EventSink,
    ) -> Result<RoundtableOutcome, OrchestratorError> {
        config.validate()?;
        if !self.store.exists(session_id).await? {
            return Err(StorageError::NotFound(format!("session {}", session_id)).into());
        }
        let guard = self
            .registry
            .try_activate(session_id)
            .ok_or_else(|| OrchestratorError::SessionActive(session_id.to_string()))?;

        let report = self.store.load_report(session_id).await?;
        let mut snapshot = self
            .store
            .load_config(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::MissingRoundtableConfig(session_id.to_string()))?;
        snapshot.force_max_iterations |= self.options.force_max_iterations;

        let inconsistent = |detail: String| OrchestratorError::InconsistentSession {
            session_id: session_id.to_string(),
            detail,
        };
        let latest = self
            .store
            .latest_version(session_id)
            .await?
            .ok_or_else(|| inconsistent("no document versions saved".to_string()))?;
        let (history, document, latest_reviews) = self.load_history(session_id, latest).await?;

        // a version after the report's final one means an extension was interrupted
        let report_final = report.as_ref().map(|r| r.final_version);
        if let Some(final_version) = report_final
            && latest < final_version
        {
            return Err(inconsistent(format!(
                "report ends at version {} but only {} version(s) are saved",
                final_version, latest
            )));
        }
        let finished_here = report_final == Some(latest);
        if finished_here && latest_reviews.is_empty() {
            return Err(inconsistent(format!(
                "final version {} has no reviews",
                latest
            )));
        }
        let restored_reviews = (!latest_reviews.is_empty()).then_some(latest_reviews);
        let completed = history.len() as u32 + u32::from(restored_reviews.is_some());

        if completed >= config.max_iterations {
            return Err(OrchestratorError::NothingToResume {
                session_id: session_id.to_string(),
                completed,
                max_iterations: config.max_iterations,
            });
        }
        if finished_here
            && let Some(reviews) = &restored_reviews
            && config.custom_stop_condition.is_none()
            && config.stop_on_no_high_issues
            && !snapshot.force_max_iterations
            && !has_high_severity_issues(reviews)
        {
            return Err(OrchestratorError::AlreadyConverged(session_id.to_string()));
        }

        let roster = self
            .roster_factory
            .build(&snapshot)
            .map_err(OrchestratorError::Roster)?;

        info!(
            session_id,
            completed,
            version = document.version,
            participants = roster.agents.len(),
            max_iterations = config.max_iterations,
            extending = report.is_some(),
            "Resuming roundtable"
        );
        events.emit(RoundtableEvent::new(
            names::SESSION_RESUMED,
            json!({
                "session_id": session_id,
                "start_iteration": history.len() + 1,
                "start_version": document.version,
                "reviews_restored": restored_reviews.is_some(),
                "participants": snapshot.participant_names(),
                "max_iterations": config.max_iterations,
            }),
        ));

        let run = SessionRun {
            session_id: session_id.to_string(),
            snapshot,
            roster,
            config,
            document,
            history,
            started_at: Utc::now(),
            continued_from: Some(completed),
            restored_reviews,
            supersedes_report: report.is_some(),
        };
        self.drive(run, &guard, events).await
    }

    /// Delete a session that is not currently running
    pub async fn delete_session(&self, session_id: &str) -> Result<(), OrchestratorError> {
        if self.registry.is_active(session_id) {
            return Err(OrchestratorError::SessionActive(session_id.to_string()));
        }
        self.store.delete_session(session_id).await?;
        info!(session_id, "Session deleted");
        Ok(())
    }

    /// The loop shared by fresh and resumed runs
    async fn drive(
        &self,
        mut run: SessionRun,
        guard: &ActiveSessionGuard,
        events: &dyn EventSink,
    ) -> Result<RoundtableOutcome, OrchestratorError> {
        debug!(session_id = guard.session_id(), "Driving session loop");
        let max_iterations = run.config.max_iterations;

        let decision = loop {
            let iteration_index = run.history.len() as u32 + 1;

            events.emit(RoundtableEvent::new(
                names::ITERATION_START,
                json!({
                    "session_id": run.session_id,
                    "iteration": iteration_index,
                    "max_iterations": max_iterations,
                    "version": run.document.version,
                }),
            ));
            info!(
                session_id = %run.session_id,
                "Iteration {}/{}",
                iteration_index,
                max_iterations
            );

            let restored = run.restored_reviews.take();
            let reviews_saved = restored.is_some();
            let result = match restored {
                Some(reviews) => {
                    debug!(
                        session_id = %run.session_id,
                        reviews = reviews.len(),
                        "Refining with restored reviews"
                    );
                    self.engine
                        .refine_with_events(
                            &run.document,
                            reviews,
                            &run.roster.moderator,
                            &run.snapshot.context,
                            iteration_index,
                            events,
                        )
                        .await
                }
                None => {
                    self.engine
                        .step_with_events(
                            &run.document,
                            &run.roster.agents,
                            &run.roster.moderator,
                            &run.snapshot.context,
                            iteration_index,
                            events,
                        )
                        .await
                }
            };
            let iteration = result.map_err(|source| {
                warn!(
                    session_id = %run.session_id,
                    iteration = iteration_index,
                    "Iteration failed: {}",
                    source
                );
                OrchestratorError::Iteration {
                    session_id: run.session_id.clone(),
                    iteration: iteration_index,
                    source,
                }
            })?;

            if !reviews_saved {
                self.store
                    .save_reviews(&run.session_id, run.document.version, &iteration.reviews)
                    .await?;
            }
            let refined_content = iteration.output_document.clone();
            run.history.push(iteration);

            let decision = decide(&run.config, &run.history)?;
            let completed = run.history.len();
            let forced = decision.should_stop
                && decision.stopped_by == StoppedBy::NoHighIssues
                && run.snapshot.force_max_iterations
                && completed < max_iterations as usize;

            let counts = run
                .history
                .last()
                .map(RoundtableIteration::severity_counts)
                .unwrap_or_default();
            events.emit(RoundtableEvent::new(
                names::CONVERGENCE_CHECKED,
                json!({
                    "session_id": run.session_id,
                    "iteration": iteration_index,
                    "should_stop": decision.should_stop,
                    "reason": decision.reason,
                    "stopped_by": decision.stopped_by,
                    "issue_counts": counts,
                    "forced": forced,
                }),
            ));
            info!(session_id = %run.session_id, "Status: {}", decision.reason);

            if decision.should_stop && !forced {
                break decision;
            }
            if forced {
                info!(
                    session_id = %run.session_id,
                    "Converged, but forcing next iteration ({}/{})",
                    completed,
                    max_iterations
                );
            }
            if completed >= max_iterations as usize {
                // a custom predicate kept the loop going up to the ceiling
                break StopDecision::max_iterations(max_iterations, counts.high);
            }

            let refined = run.document.next_version(refined_content);
            self.store.save_document(&run.session_id, &refined).await?;
            events.emit(RoundtableEvent::new(
                names::DOCUMENT_SAVED,
                json!({ "session_id": run.session_id, "version": refined.version }),
            ));
            run.document = refined;
        };

        let report = build_report(&run, &decision);
        if run.supersedes_report {
            self.store.supersede_report(&run.session_id, &report).await?;
        } else {
            self.store.save_report(&run.session_id, &report).await?;
        }
        events.emit(RoundtableEvent::new(
            names::REPORT_SAVED,
            json!({ "session_id": run.session_id }),
        ));
        events.emit(RoundtableEvent::new(
            names::REFINEMENT_COMPLETE,
            json!({
                "session_id": run.session_id,
                "final_version": report.final_version,
                "iterations": report.iteration_count,
                "converged": report.converged,
                "reason": report.convergence_reason,
                "stopped_by": report.stopped_by,
                "final_issue_count": report.final_issue_count,
                "total_tokens": report.total_tokens,
            }),
        ));

        info!(
            session_id = %run.session_id,
            final_version = report.final_version,
            iterations = report.iteration_count,
            converged = report.converged,
            "Roundtable complete: {}",
            report.convergence_reason
        );

        let final_reviews = run
            .history
            .last()
            .map(|it| it.reviews.clone())
            .unwrap_or_default();
        Ok(RoundtableOutcome {
            session_id: run.session_id,
            final_document: run.document.with_reviews(final_reviews),
            iterations: run.history,
            decision,
            report,
        })
    }

    /// Rebuild iterations 1..latest from persisted versions and reviews
    ///
    /// Iteration `k` reviewed version `k` and produced version `k + 1`.
    /// Returns the completed iterations, the latest version, and the reviews
    /// already saved for it: empty for a run that stopped before reviewing
    /// it, filled for a finished run or one that failed while refining.
    async fn load_history(
        &self,
        session_id: &str,
        latest: u32,
    ) -> Result<(Vec<RoundtableIteration>, Document, Vec<Review>), OrchestratorError> {
        let mut history = Vec::new();
        let mut current = self.store.load_document(session_id, 1).await?;

        for version in 1..latest {
            let reviews = self.store.load_reviews(session_id, version).await?;
            if reviews.is_empty() {
                return Err(OrchestratorError::InconsistentSession {
                    session_id: session_id.to_string(),
                    detail: format!("version {} was refined but has no reviews", version),
                });
            }
            let next = self.store.load_document(session_id, version + 1).await?;

            let mut usage = UsageLedger::new();
            for review in &reviews {
                if let Some(u) = &review.usage {
                    usage.record(review.reviewer_name.clone(), u);
                }
            }
            history.push(
                RoundtableIteration::new(
                    version,
                    current.content.clone(),
                    next.content.clone(),
                    reviews,
                )
                .with_usage(usage),
            );
            current = next;
        }

        let latest_reviews = self.store.load_reviews(session_id, latest).await?;
        Ok((history, current, latest_reviews))
    }
}

fn build_report(run: &SessionRun, decision: &StopDecision) -> ConvergenceReport {
    let mut token_usage = UsageLedger::new();
    for iteration in &run.history {
        token_usage.merge(&iteration.usage);
    }

    ConvergenceReport {
        session_id: run.session_id.clone(),
        title: run.document.title.clone(),
        document_type: run.document.document_type.clone(),
        initial_version: 1,
        final_version: run.document.version,
        iteration_count: run.history.len() as u32,
        converged: decision.is_converged(),
        convergence_reason: decision.reason.clone(),
        stopped_by: decision.stopped_by,
        total_issues_identified: run.history.iter().map(RoundtableIteration::issue_count).sum(),
        final_issue_count: run
            .history
            .last()
            .map(RoundtableIteration::severity_counts)
            .unwrap_or_default(),
        total_tokens: token_usage.total(),
        token_usage,
        started_at: run.started_at,
        finished_at: Utc::now(),
        participants: run.snapshot.participants.clone(),
        moderator_focus: run.snapshot.moderator_focus.clone(),
        convergence_criteria: run.snapshot.convergence_criteria.clone(),
        continued_from_iteration: run.continued_from,
        history: run
            .history
            .iter()
            .map(|it| IterationSummary::from_iteration(it, it.iteration_index))
            .collect(),
    }
}
