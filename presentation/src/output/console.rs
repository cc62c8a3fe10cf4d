//! Console output formatter for roundtable results

use colored::Colorize;
use roundtable_domain::{ConvergenceReport, Document, Review, SessionEntry, Severity};
use serde_json::json;

/// Formats roundtable reports and documents for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Report, per-iteration history and the final document
    pub fn format(report: &ConvergenceReport, document: &Document) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Roundtable Results"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Title:".cyan().bold(), report.title));
        output.push_str(&format!("{} {}\n", "Session:".cyan().bold(), report.session_id));
        output.push_str(&format!(
            "{} {}\n",
            "Participants:".cyan().bold(),
            report
                .participants
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        if let Some(resumed) = report.continued_from_iteration {
            output.push_str(&format!(
                "{} after iteration {}\n",
                "Resumed:".cyan().bold(),
                resumed
            ));
        }

        output.push_str(&Self::section_header("Outcome"));
        output.push_str(&Self::outcome_lines(report));

        output.push_str(&Self::section_header("Iterations"));
        for entry in &report.history {
            output.push_str(&format!(
                "  {} v{}  {} issue(s): {} high, {} medium, {} low  ({} tokens)\n",
                format!("#{}", entry.iteration).yellow().bold(),
                entry.document_version,
                entry.issues_count,
                entry.severity_counts.high,
                entry.severity_counts.medium,
                entry.severity_counts.low,
                entry.tokens
            ));
        }

        if !report.token_usage.is_empty() {
            output.push_str(&Self::section_header("Token Usage"));
            for (participant, tokens) in report.token_usage.iter() {
                output.push_str(&format!("  {:<24} {}\n", participant, tokens));
            }
            output.push_str(&format!(
                "  {:<24} {}\n",
                "total".bold(),
                report.total_tokens
            ));
        }

        if !document.reviews.is_empty() {
            output.push_str(&Self::section_header("Remaining Issues"));
            output.push_str(&Self::reviews(&document.reviews));
        }

        output.push_str(&Self::section_header(&format!(
            "Final Document (v{})",
            document.version
        )));
        output.push('\n');
        output.push_str(&document.content);
        output.push('\n');

        output.push_str(&Self::footer());
        output
    }

    /// Outcome only (concise output)
    pub fn format_summary(report: &ConvergenceReport) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{}\n\n",
            "=== Roundtable Outcome ===".cyan().bold()
        ));
        output.push_str(&format!("{} {}\n", "Title:".bold(), report.title));
        output.push_str(&format!("{} {}\n", "Session:".bold(), report.session_id));
        output.push_str(&Self::outcome_lines(report));
        output
    }

    /// Report and final document as one JSON object
    pub fn format_json(report: &ConvergenceReport, document: &Document) -> String {
        serde_json::to_string_pretty(&json!({
            "report": report,
            "final_document": document,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    /// One document version with the reviews it received
    pub fn format_version(document: &Document) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!(
            "{} (v{})",
            document.title, document.version
        )));
        output.push('\n');
        output.push_str(&format!(
            "{} {}   {} {}\n",
            "Type:".cyan().bold(),
            document.document_type,
            "Created:".cyan().bold(),
            document.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push('\n');
        output.push_str(&document.content);
        output.push('\n');

        if document.reviews.is_empty() {
            output.push_str(&format!("\n{}\n", "Not reviewed.".dimmed()));
        } else {
            output.push_str(&Self::section_header("Reviews"));
            output.push_str(&Self::reviews(&document.reviews));
        }
        output.push_str(&Self::footer());
        output
    }

    pub fn format_version_json(document: &Document) -> String {
        serde_json::to_string_pretty(document).unwrap_or_else(|_| "{}".to_string())
    }

    /// Session index, one line per session
    pub fn format_sessions(sessions: &[SessionEntry]) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No sessions.".dimmed());
        }
        sessions
            .iter()
            .map(|s| {
                format!(
                    "{}  {}  {}\n",
                    s.session_id.yellow(),
                    s.created_at.format("%Y-%m-%d %H:%M"),
                    s.title
                )
            })
            .collect()
    }

    fn outcome_lines(report: &ConvergenceReport) -> String {
        let status = if report.converged {
            "converged".green().bold()
        } else {
            "stopped".yellow().bold()
        };
        let mut output = format!(
            "{} {} ({})\n",
            "Status:".bold(),
            status,
            report.stopped_by.as_str()
        );
        output.push_str(&format!("{} {}\n", "Reason:".bold(), report.convergence_reason));
        output.push_str(&format!(
            "{} {} (v{} -> v{})\n",
            "Iterations:".bold(),
            report.iteration_count,
            report.initial_version,
            report.final_version
        ));
        output.push_str(&format!(
            "{} {} total; final round {} high, {} medium, {} low\n",
            "Issues:".bold(),
            report.total_issues_identified,
            report.final_issue_count.high,
            report.final_issue_count.medium,
            report.final_issue_count.low
        ));
        output
    }

    fn reviews(reviews: &[Review]) -> String {
        let mut output = String::new();
        for review in reviews {
            output.push_str(&format!(
                "\n{}\n",
                format!("── {} ──", review.reviewer_name).yellow().bold()
            ));
            if !review.overall_assessment.is_empty() {
                output.push_str(&format!("{}\n", review.overall_assessment));
            }
            for issue in &review.issues {
                let severity = match issue.severity {
                    Severity::High => issue.severity.as_str().red().bold(),
                    Severity::Medium => issue.severity.as_str().yellow(),
                    Severity::Low => issue.severity.as_str().normal(),
                };
                output.push_str(&format!(
                    "  [{}] {}: {}\n",
                    severity, issue.category, issue.description
                ));
                if let Some(fix) = &issue.suggested_fix {
                    output.push_str(&format!("      {} {}\n", "fix:".dimmed(), fix));
                }
            }
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
