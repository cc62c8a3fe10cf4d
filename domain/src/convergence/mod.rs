//! Convergence domain
//!
//! Pure functions that decide whether a roundtable should keep iterating.
//!
//! # Rule order
//!
//! | # | Rule | Fires when | `stopped_by` |
//! |---|------|-----------|--------------|
//! | 1 | Custom predicate | configured (its answer is final) | `custom` |
//! | 2 | No High issues | latest reviews contain zero High issues | `no_high_issues` |
//! | 3 | Iteration ceiling | completed iterations ≥ `max_iterations` | `max_iterations` |
//! | 4 | Stability | ≥ 2 iterations and output delta < threshold | `delta_threshold` |
//! | 5 | Otherwise | - | `none` |

pub mod decider;
pub mod delta;

pub use decider::decide;

use crate::document::entities::Review;
use crate::document::severity::{Severity, SeverityCounts};

/// Count issues by severity across all `reviews`
pub fn count_issues_by_severity(reviews: &[Review]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for issue in reviews.iter().flat_map(|r| r.issues.iter()) {
        counts.add(issue.severity);
    }
    counts
}

pub fn has_high_severity_issues(reviews: &[Review]) -> bool {
    reviews
        .iter()
        .flat_map(|r| r.issues.iter())
        .any(|i| i.severity == Severity::High)
}
