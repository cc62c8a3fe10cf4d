//! Multi-rule convergence decider

use super::delta::document_delta;
use super::has_high_severity_issues;
use crate::core::error::ConvergenceError;
use crate::roundtable::config::RoundtableConfig;
use crate::roundtable::decision::StopDecision;
use crate::roundtable::iteration::RoundtableIteration;

/// Decide whether the roundtable should stop after `iterations`
///
/// Rules are evaluated in order against the latest iteration (and, for the
/// stability rule, the one before it); the first rule that fires wins:
///
/// 1. a configured custom predicate decides alone
/// 2. no High-severity issue in the latest reviews (if enabled)
/// 3. the iteration ceiling, which also stops runs that still have High issues
/// 4. the latest two outputs differ by less than `delta_threshold`
///
/// An empty history never stops. A history whose indices do not increase by
/// exactly one is rejected.
///
/// # Example
///
/// ```
/// use roundtable_domain::{decide, RoundtableConfig, RoundtableIteration, StoppedBy};
///
/// let config = RoundtableConfig::new(3);
/// assert!(!decide(&config, &[]).unwrap().should_stop);
///
/// let clean = RoundtableIteration::new(1, "draft", "better draft", vec![]);
/// let decision = decide(&config, &[clean]).unwrap();
/// assert_eq!(decision.stopped_by, StoppedBy::NoHighIssues);
/// ```
pub fn decide(
    config: &RoundtableConfig,
    iterations: &[RoundtableIteration],
) -> Result<StopDecision, ConvergenceError> {
    validate_history(iterations)?;

    let Some(latest) = iterations.last() else {
        return Ok(StopDecision::not_started());
    };

    if let Some(predicate) = &config.custom_stop_condition {
        return Ok(match predicate(iterations) {
            Some(reason) => StopDecision::custom(reason),
            None => StopDecision::proceed("Custom stop condition not met"),
        });
    }

    if config.stop_on_no_high_issues && !has_high_severity_issues(&latest.reviews) {
        return Ok(StopDecision::no_high_issues());
    }

    let high_remaining = latest.high_severity_count();

    if iterations.len() >= config.max_iterations as usize {
        return Ok(StopDecision::max_iterations(
            config.max_iterations,
            high_remaining,
        ));
    }

    if let [.., previous, latest] = iterations {
        let delta = document_delta(&previous.output_document, &latest.output_document);
        if delta < config.delta_threshold {
            return Ok(StopDecision::stable(delta));
        }
    }

    Ok(StopDecision::high_issues_remain(high_remaining))
}

fn validate_history(iterations: &[RoundtableIteration]) -> Result<(), ConvergenceError> {
    let Some(first) = iterations.first() else {
        return Ok(());
    };
    if first.iteration_index == 0 {
        return Err(ConvergenceError::ZeroIterationIndex(0));
    }
    for pair in iterations.windows(2) {
        let expected = pair[0].iteration_index + 1;
        if pair[1].iteration_index != expected {
            return Err(ConvergenceError::NonContiguousHistory {
                expected,
                found: pair[1].iteration_index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::entities::{Issue, Review};
    use crate::document::severity::Severity;
    use crate::roundtable::decision::StoppedBy;

    fn iteration(index: u32, output: &str, severities: &[Severity]) -> RoundtableIteration {
        let issues = severities
            .iter()
            .map(|s| Issue::new("cat", "desc", *s, "Critic"))
            .collect();
        RoundtableIteration::new(
            index,
            "input",
            output,
            vec![Review::new("Critic", issues, "assessment")],
        )
    }

    fn history(outputs: &[&str], severities: &[Severity]) -> Vec<RoundtableIteration> {
        outputs
            .iter()
            .enumerate()
            .map(|(i, out)| iteration(i as u32 + 1, out, severities))
            .collect()
    }

    #[test]
    fn test_empty_history_never_stops() {
        let configs = [
            RoundtableConfig::new(1),
            RoundtableConfig::new(3).with_delta_threshold(1.0),
            RoundtableConfig::new(2).with_custom_stop_condition(|_| Some("always".into())),
        ];
        for config in &configs {
            let decision = decide(config, &[]).unwrap();
            assert!(!decision.should_stop);
            assert_eq!(decision.stopped_by, StoppedBy::None);
        }
    }

    #[test]
    fn test_stop_on_no_high_issues() {
        let config = RoundtableConfig::new(5);
        let decision = decide(&config, &[iteration(1, "out", &[Severity::Low])]).unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::NoHighIssues);
        assert!(decision.reason.contains("0 remaining"));
    }

    #[test]
    fn test_no_high_issues_wins_regardless_of_iteration_count() {
        let config = RoundtableConfig::new(2);
        let iterations = history(&["a", "b", "c", "d"], &[Severity::Medium]);
        for n in 1..=iterations.len() {
            let decision = decide(&config, &iterations[..n]).unwrap();
            assert_eq!(decision.stopped_by, StoppedBy::NoHighIssues);
        }
    }

    #[test]
    fn test_disabled_no_high_rule_falls_through() {
        let config = RoundtableConfig::new(5)
            .with_stop_on_no_high_issues(false)
            .with_delta_threshold(0.0);
        let decision = decide(&config, &[iteration(1, "out", &[])]).unwrap();
        assert!(!decision.should_stop);
        assert_eq!(decision.reason, "0 high severity issues remain");
    }

    #[test]
    fn test_stop_on_max_iterations_with_high_issues() {
        let config = RoundtableConfig::new(3);
        let iterations = history(&["one", "two two", "three three three"], &[Severity::High]);
        let decision = decide(&config, &iterations).unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::MaxIterations);
        assert_eq!(
            decision.reason,
            "Max iterations reached (3). 1 high severity issues remain."
        );
    }

    #[test]
    fn test_max_iterations_of_one() {
        let config = RoundtableConfig::new(1);
        let decision = decide(&config, &[iteration(1, "out", &[Severity::High])]).unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::MaxIterations);
    }

    #[test]
    fn test_stop_on_delta_threshold() {
        let config = RoundtableConfig::new(10).with_delta_threshold(0.05);
        let iterations = history(&["stable text", "stable text"], &[Severity::High]);
        let decision = decide(&config, &iterations).unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::DeltaThreshold);
        assert_eq!(decision.reason, "Document stable (delta: 0.00%)");
    }

    #[test]
    fn test_delta_rule_needs_two_iterations() {
        let config = RoundtableConfig::new(10).with_delta_threshold(1.0);
        let decision = decide(&config, &[iteration(1, "", &[Severity::High])]).unwrap();
        assert!(!decision.should_stop);
    }

    #[test]
    fn test_empty_outputs_count_as_stable() {
        let config = RoundtableConfig::new(10).with_delta_threshold(0.05);
        let iterations = history(&["", ""], &[Severity::High]);
        let decision = decide(&config, &iterations).unwrap();
        assert_eq!(decision.stopped_by, StoppedBy::DeltaThreshold);
    }

    #[test]
    fn test_continue_when_high_issues_remain() {
        let config = RoundtableConfig::new(10).with_delta_threshold(0.05);
        let iterations = history(&["first draft", "a completely rewritten body"], &[
            Severity::High,
            Severity::High,
        ]);
        let decision = decide(&config, &iterations).unwrap();
        assert!(!decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::None);
        assert_eq!(decision.reason, "2 high severity issues remain");
    }

    #[test]
    fn test_custom_stop_condition_stops() {
        let config = RoundtableConfig::new(10)
            .with_custom_stop_condition(|its| (its.len() >= 2).then(|| "two is enough".into()));
        let iterations = history(&["a", "b"], &[Severity::High]);
        let decision = decide(&config, &iterations).unwrap();
        assert!(decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::Custom);
        assert_eq!(decision.reason, "two is enough");
    }

    #[test]
    fn test_custom_stop_condition_overrides_builtin_rules() {
        let config = RoundtableConfig::new(1).with_custom_stop_condition(|_| None);
        // no High issues and ceiling reached, but the predicate says continue
        let decision = decide(&config, &[iteration(1, "out", &[])]).unwrap();
        assert!(!decision.should_stop);
        assert_eq!(decision.stopped_by, StoppedBy::None);
    }

    #[test]
    fn test_reason_is_deterministic() {
        let config = RoundtableConfig::new(4).with_delta_threshold(0.5);
        let iterations = history(&["abc def", "abc deg"], &[Severity::High]);
        let first = decide(&config, &iterations).unwrap();
        let second = decide(&config, &iterations).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_non_contiguous_history() {
        let config = RoundtableConfig::new(5);
        let iterations = vec![
            iteration(1, "a", &[Severity::High]),
            iteration(3, "b", &[Severity::High]),
        ];
        assert_eq!(
            decide(&config, &iterations),
            Err(ConvergenceError::NonContiguousHistory {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            decide(&config, &[iteration(0, "a", &[])]),
            Err(ConvergenceError::ZeroIterationIndex(0))
        );
    }

    #[test]
    fn test_resumed_history_may_start_later() {
        let config = RoundtableConfig::new(5);
        let iterations = vec![
            iteration(3, "a", &[Severity::High]),
            iteration(4, "completely different", &[Severity::High]),
        ];
        assert!(decide(&config, &iterations).is_ok());
    }
}
