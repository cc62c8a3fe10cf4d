//! Progress reporting for roundtable execution
//!
//! Both reporters are [`EventSink`]s: they read the lifecycle event payloads
//! and never influence the loop.

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use roundtable_application::ports::event_sink::{EventSink, RoundtableEvent, names};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

fn field_str<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or("")
}

fn field_u64(payload: &Value, key: &str) -> u64 {
    payload.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn field_bool(payload: &Value, key: &str) -> bool {
    payload.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn participant_count(payload: &Value) -> u64 {
    payload
        .get("participants")
        .and_then(Value::as_array)
        .map(|p| p.len() as u64)
        .unwrap_or(0)
}

#[derive(Default)]
struct ReporterState {
    participants: u64,
    iteration_bar: Option<ProgressBar>,
}

/// Reports progress with one progress bar per iteration
pub struct ProgressReporter {
    multi: MultiProgress,
    state: Mutex<ReporterState>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ReporterState::default()),
        }
    }

    fn iteration_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn state(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn println(&self, line: String) {
        // fall back to plain output when the terminal is not drawable
        if self.multi.println(&line).is_err() {
            println!("{}", line);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressReporter {
    fn emit(&self, event: RoundtableEvent) {
        let payload = &event.payload;
        match event.name {
            names::SESSION_CREATED => {
                self.state().participants = participant_count(payload);
                self.println(format!(
                    "{} {} ({})",
                    "->".cyan(),
                    field_str(payload, "title").bold(),
                    field_str(payload, "session_id").dimmed()
                ));
            }
            names::SESSION_RESUMED => {
                self.state().participants = participant_count(payload);
                self.println(format!(
                    "{} Resuming {} at iteration {}",
                    "->".cyan(),
                    field_str(payload, "session_id").bold(),
                    field_u64(payload, "start_iteration")
                ));
            }
            names::ITERATION_START => {
                let mut state = self.state();
                let pb = self.multi.add(ProgressBar::new(state.participants));
                pb.set_style(Self::iteration_style());
                pb.set_prefix(format!(
                    "Iteration {}/{}",
                    field_u64(payload, "iteration"),
                    field_u64(payload, "max_iterations")
                ));
                pb.set_message(format!("reviewing v{}", field_u64(payload, "version")));
                state.iteration_bar = Some(pb);
            }
            names::AGENT_REVIEW_COMPLETE => {
                if let Some(pb) = self.state().iteration_bar.as_ref() {
                    let high = field_u64(payload, "high");
                    let marker = if high > 0 { "!".red() } else { "v".green() };
                    pb.set_message(format!(
                        "{} {} ({} issues, {} high)",
                        marker,
                        field_str(payload, "agent"),
                        field_u64(payload, "issues"),
                        high
                    ));
                    pb.inc(1);
                }
            }
            names::MODERATOR_START => {
                if let Some(pb) = self.state().iteration_bar.as_ref() {
                    pb.set_message("moderator refining...".to_string());
                }
            }
            names::MODERATOR_COMPLETE => {
                if let Some(pb) = self.state().iteration_bar.take() {
                    pb.finish_with_message(format!(
                        "{} v{} drafted",
                        "done".green(),
                        field_u64(payload, "new_version")
                    ));
                }
            }
            names::CONVERGENCE_CHECKED => {
                let marker = if field_bool(payload, "should_stop") {
                    "stop".green().bold()
                } else {
                    "continue".yellow().bold()
                };
                let forced = if field_bool(payload, "forced") {
                    " (forced to continue)"
                } else {
                    ""
                };
                self.println(format!(
                    "   {}: {}{}",
                    marker,
                    field_str(payload, "reason"),
                    forced
                ));
            }
            names::REFINEMENT_COMPLETE => {
                if let Some(pb) = self.state().iteration_bar.take() {
                    pb.finish_and_clear();
                }
                self.println(format!(
                    "{} Finished after {} iteration(s) at v{}",
                    "->".cyan(),
                    field_u64(payload, "iterations"),
                    field_u64(payload, "final_version")
                ));
            }
            _ => {}
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl EventSink for SimpleProgress {
    fn emit(&self, event: RoundtableEvent) {
        let payload = &event.payload;
        match event.name {
            names::ITERATION_START => println!(
                "{} {} {}/{} (v{})",
                "->".cyan(),
                "Iteration".bold(),
                field_u64(payload, "iteration"),
                field_u64(payload, "max_iterations"),
                field_u64(payload, "version")
            ),
            names::AGENT_REVIEW_COMPLETE => println!(
                "  {} {} ({} issues, {} high)",
                "v".green(),
                field_str(payload, "agent"),
                field_u64(payload, "issues"),
                field_u64(payload, "high")
            ),
            names::MODERATOR_COMPLETE => println!(
                "  {} moderator drafted v{}",
                "v".green(),
                field_u64(payload, "new_version")
            ),
            names::CONVERGENCE_CHECKED => {
                println!("  {}", field_str(payload, "reason").dimmed());
                println!();
            }
            _ => {}
        }
    }
}
