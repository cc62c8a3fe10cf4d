//! Review response parsing
//!
//! Reviewers are asked for a JSON object, but model output is rarely that
//! clean. The parser looks for the object in three places, in order:
//!
//! 1. the whole (trimmed) response
//! 2. the body of each fenced code block
//! 3. the span from the first `{` to the last `}`
//!
//! Issue fields are read leniently: `section` stands in for `category`,
//! `issue` for `description` and `fix` for `suggested_fix`. A missing
//! severity means Low; a missing reviewer means the reviewing persona.
//!
//! # Example
//!
//! ```
//! use roundtable_domain::{parse_review, Severity};
//!
//! let response = r#"Here is my review:
//! {"issues": [{"section": "Auth", "issue": "No token expiry", "severity": "High"}],
//!  "overall_assessment": "Needs work"}"#;
//!
//! let review = parse_review(response, "Security").unwrap();
//! assert_eq!(review.reviewer_name, "Security");
//! assert_eq!(review.issues[0].category, "Auth");
//! assert_eq!(review.issues[0].severity, Severity::High);
//! ```

use crate::document::entities::{Issue, Review};
use crate::document::severity::Severity;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("invalid review JSON: {0}")]
    InvalidJson(String),

    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),
}

/// Parse a reviewer's raw response into a [`Review`] attributed to `reviewer`
pub fn parse_review(response: &str, reviewer: &str) -> Result<Review, ParseError> {
    let object = extract_object(response)?;

    let issues = match object.get("issues") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| parse_issue(item, reviewer))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ParseError::InvalidJson(format!(
                "'issues' must be an array, got {}",
                type_name(other)
            )));
        }
    };

    let assessment = first_text(&object, &["overall_assessment", "assessment", "summary"])
        .unwrap_or_default();

    Ok(Review::new(reviewer, issues, assessment))
}

fn extract_object(response: &str) -> Result<Map<String, Value>, ParseError> {
    let mut last_error = None;

    for candidate in candidates(response) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(other) => {
                last_error = Some(ParseError::InvalidJson(format!(
                    "expected an object, got {}",
                    type_name(&other)
                )));
            }
            Err(e) => last_error = Some(ParseError::InvalidJson(e.to_string())),
        }
    }

    Err(last_error.unwrap_or(ParseError::NoJson))
}

/// Candidate JSON spans, most specific first
fn candidates(response: &str) -> Vec<&str> {
    let mut found = Vec::new();

    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        found.push(trimmed);
    }

    let mut rest = response;
    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        // skip the info string (e.g. "json") up to the end of the line
        let body_start = after_fence.find('\n').map(|n| n + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        let Some(close) = body.find("```") else {
            break;
        };
        let block = body[..close].trim();
        if block.starts_with('{') {
            found.push(block);
        }
        rest = &body[close + 3..];
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}'))
        && start < end
    {
        found.push(&response[start..=end]);
    }

    found
}

fn parse_issue(item: &Value, reviewer: &str) -> Result<Issue, ParseError> {
    let Value::Object(fields) = item else {
        return Err(ParseError::InvalidJson(format!(
            "issue must be an object, got {}",
            type_name(item)
        )));
    };

    let severity = match first_text(fields, &["severity"]) {
        Some(raw) => raw
            .parse::<Severity>()
            .map_err(|_| ParseError::UnknownSeverity(raw))?,
        None => Severity::Low,
    };

    let mut issue = Issue::new(
        first_text(fields, &["category", "section"]).unwrap_or_else(|| "General".to_string()),
        first_text(fields, &["description", "issue"]).unwrap_or_default(),
        severity,
        first_text(fields, &["reviewer"]).unwrap_or_else(|| reviewer.to_string()),
    );
    if let Some(fix) = first_text(fields, &["suggested_fix", "fix"]) {
        issue = issue.with_suggested_fix(fix);
    }
    Ok(issue)
}

/// First non-empty string among `keys`
fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let response = r#"{
            "issues": [
                {"category": "Scope", "description": "Goals are vague", "severity": "Medium",
                 "suggested_fix": "List measurable goals"}
            ],
            "overall_assessment": "Reasonable start"
        }"#;

        let review = parse_review(response, "Product").unwrap();
        assert_eq!(review.reviewer_name, "Product");
        assert_eq!(review.overall_assessment, "Reasonable start");
        assert_eq!(review.issues.len(), 1);
        let issue = &review.issues[0];
        assert_eq!(issue.category, "Scope");
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.suggested_fix.as_deref(), Some("List measurable goals"));
        assert_eq!(issue.reviewer, "Product");
    }

    #[test]
    fn test_parse_fenced_block_with_prose() {
        let response = "Sure! Here you go.\n```json\n{\"issues\": [], \"overall_assessment\": \"Fine\"}\n```\nLet me know.";
        let review = parse_review(response, "Editor").unwrap();
        assert!(review.issues.is_empty());
        assert_eq!(review.overall_assessment, "Fine");
    }

    #[test]
    fn test_parse_embedded_object() {
        let response = "My review: {\"issues\": [{\"issue\": \"Typo\", \"severity\": \"low\"}]} end";
        let review = parse_review(response, "Editor").unwrap();
        assert_eq!(review.issues[0].description, "Typo");
        assert_eq!(review.issues[0].severity, Severity::Low);
    }

    #[test]
    fn test_alias_fields_and_defaults() {
        let response = r#"{"issues": [{"section": "Auth", "issue": "Plaintext secrets", "fix": "Use a vault"}]}"#;
        let review = parse_review(response, "Security").unwrap();
        let issue = &review.issues[0];
        assert_eq!(issue.category, "Auth");
        assert_eq!(issue.description, "Plaintext secrets");
        assert_eq!(issue.suggested_fix.as_deref(), Some("Use a vault"));
        assert_eq!(issue.severity, Severity::Low);
        assert_eq!(issue.reviewer, "Security");
        assert_eq!(review.overall_assessment, "");
    }

    #[test]
    fn test_missing_category_is_general() {
        let review = parse_review(r#"{"issues": [{"description": "x", "severity": "HIGH"}]}"#, "A")
            .unwrap();
        assert_eq!(review.issues[0].category, "General");
        assert_eq!(review.issues[0].severity, Severity::High);
    }

    #[test]
    fn test_explicit_reviewer_is_kept() {
        let review = parse_review(
            r#"{"issues": [{"description": "x", "reviewer": "Guest"}]}"#,
            "Host",
        )
        .unwrap();
        assert_eq!(review.reviewer_name, "Host");
        assert_eq!(review.issues[0].reviewer, "Guest");
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        let result = parse_review(r#"{"issues": [{"description": "x", "severity": "Critical"}]}"#, "A");
        assert_eq!(result, Err(ParseError::UnknownSeverity("Critical".to_string())));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(parse_review("Looks good to me!", "A"), Err(ParseError::NoJson));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_review("{\"issues\": [", "A"),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_review(r#"{"issues": "none"}"#, "A"),
            Err(ParseError::InvalidJson(_))
        ));
    }
}
