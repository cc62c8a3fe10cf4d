//! Resource usage reported by agents and moderators

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ledger key under which moderator usage is recorded
pub const MODERATOR_USAGE_KEY: &str = "moderator";

/// Token usage of a single completion (or a sum of several)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create usage from prompt and completion counts; the total is derived.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: Self) -> Self::Output {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Total tokens per participant, keyed by agent name (plus [`MODERATOR_USAGE_KEY`])
///
/// Backed by a `BTreeMap` so serialized ledgers have a stable key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLedger {
    entries: BTreeMap<String, u64>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `usage` to the running total for `participant`
    pub fn record(&mut self, participant: impl Into<String>, usage: &TokenUsage) {
        *self.entries.entry(participant.into()).or_insert(0) += usage.total_tokens;
    }

    /// Fold another ledger into this one
    pub fn merge(&mut self, other: &UsageLedger) {
        for (name, tokens) in &other.entries {
            *self.entries.entry(name.clone()).or_insert(0) += tokens;
        }
    }

    pub fn get(&self, participant: &str) -> u64 {
        self.entries.get(participant).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.entries.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage::new(10, 5);
        usage += TokenUsage::new(1, 2);
        assert_eq!(usage.prompt_tokens, 11);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 18);
        assert!(TokenUsage::default().is_empty());
    }

    #[test]
    fn test_ledger_record_and_merge() {
        let mut ledger = UsageLedger::new();
        ledger.record("Security", &TokenUsage::new(100, 20));
        ledger.record(MODERATOR_USAGE_KEY, &TokenUsage::new(200, 300));
        ledger.record("Security", &TokenUsage::new(10, 0));

        let mut other = UsageLedger::new();
        other.record("Product", &TokenUsage::new(5, 5));
        ledger.merge(&other);

        assert_eq!(ledger.get("Security"), 130);
        assert_eq!(ledger.get("Product"), 10);
        assert_eq!(ledger.get("missing"), 0);
        assert_eq!(ledger.total(), 640);
    }

    #[test]
    fn test_ledger_serializes_as_flat_map() {
        let mut ledger = UsageLedger::new();
        ledger.record("b", &TokenUsage::new(1, 1));
        ledger.record("a", &TokenUsage::new(2, 0));
        let json = serde_json::to_string(&ledger).unwrap();
        assert_eq!(json, r#"{"a":2,"b":2}"#);
    }
}
