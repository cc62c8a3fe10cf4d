//! Issue severity and per-severity counters

use serde::{Deserialize, Serialize};

/// Severity of a single review issue
///
/// Serialized with capitalised names (`"High"`, `"Medium"`, `"Low"`) so that
/// persisted reviews stay readable.
///
/// # Example
///
/// ```
/// use roundtable_domain::Severity;
///
/// assert_eq!("high".parse::<Severity>().ok(), Some(Severity::High));
/// assert_eq!(Severity::Medium.to_string(), "Medium");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!(
                "Unknown severity: {}. Valid: high, medium, low",
                other
            )),
        }
    }
}

/// Issue counts partitioned by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// Count one issue of the given severity
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

impl std::ops::AddAssign for SeverityCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.high += rhs.high;
        self.medium += rhs.medium;
        self.low += rhs.low;
    }
}
