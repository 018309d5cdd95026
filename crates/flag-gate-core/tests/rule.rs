// crates/flag-gate-core/tests/rule.rs
// ============================================================================
// Module: Rule Tests
// Description: Rule applicability, strategy selection, and rule merging.
// ============================================================================

//! ## Overview
//! Validates how rules apply, pick a strategy, and merge scheduled overrides.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use flag_gate_core::AttributeView;
use flag_gate_core::BucketingError;
use flag_gate_core::ProgressiveRollout;
use flag_gate_core::ProgressiveRolloutStep;
use flag_gate_core::Rule;
use flag_gate_core::RuleError;
use flag_gate_core::RuleInput;
use flag_gate_core::RuleOutcome;
use flag_gate_core::TargetingQuery;
use flag_gate_core::evaluate_rule;
use flag_logic::LogicMode;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::Duration;

use crate::support::instant;

fn attributes(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn query(source: &str) -> TargetingQuery {
    TargetingQuery::parse(source).expect("query parses")
}

fn input<'a>(attrs: &'a Map<String, Value>) -> RuleInput<'a> {
    RuleInput {
        flag_name: "rule-flag",
        bucketing_key: "alice",
        view: AttributeView::new("alice", attrs),
        now: instant("2026-03-01T00:00:00Z"),
        logic: LogicMode::Kleene,
    }
}

// ============================================================================
// SECTION: Applicability
// ============================================================================

#[test]
fn matching_rule_selects_its_variation() {
    let attrs = attributes(&json!({"beta": true}));
    let rule = Rule::fixed("on").when(query("beta eq true"));
    assert_eq!(evaluate_rule(&rule, &input(&attrs), false), Ok(RuleOutcome::Matched("on")));
}

#[test]
fn false_or_unknown_query_is_not_applicable() {
    let rule = Rule::fixed("on").when(query("beta eq true"));
    let false_attrs = attributes(&json!({"beta": false}));
    let missing_attrs = Map::new();
    assert_eq!(evaluate_rule(&rule, &input(&false_attrs), false), Ok(RuleOutcome::NotApplicable));
    assert_eq!(evaluate_rule(&rule, &input(&missing_attrs), false), Ok(RuleOutcome::NotApplicable));
}

#[test]
fn disabled_rule_is_skipped() {
    let attrs = attributes(&json!({"beta": true}));
    let mut rule = Rule::fixed("on").when(query("beta eq true"));
    rule.disable = Some(true);
    assert_eq!(evaluate_rule(&rule, &input(&attrs), false), Ok(RuleOutcome::NotApplicable));
}

#[test]
fn default_rule_ignores_query_and_disable() {
    let attrs = Map::new();
    let mut rule = Rule::fixed("off").when(query("beta eq true"));
    rule.disable = Some(true);
    assert_eq!(evaluate_rule(&rule, &input(&attrs), true), Ok(RuleOutcome::Matched("off")));
}

#[test]
fn rule_without_query_always_applies() {
    let attrs = Map::new();
    assert_eq!(
        evaluate_rule(&Rule::fixed("on"), &input(&attrs), false),
        Ok(RuleOutcome::Matched("on"))
    );
}

// ============================================================================
// SECTION: Strategies
// ============================================================================

#[test]
fn percentage_rule_buckets_the_subject() {
    let attrs = Map::new();
    let rule = Rule::split([("A", 50.0), ("B", 50.0)]);
    let mut input = input(&attrs);
    input.flag_name = "split-flag";
    assert_eq!(evaluate_rule(&rule, &input, true), Ok(RuleOutcome::Matched("A")));
}

#[test]
fn progressive_rollout_takes_precedence() {
    let attrs = Map::new();
    let start = instant("2026-01-01T00:00:00Z");
    let mut rule = Rule::fixed("A");
    rule.progressive_rollout = Some(ProgressiveRollout {
        initial: Some(ProgressiveRolloutStep {
            variation: Some("A".to_string()),
            percentage: Some(0.0),
            date: Some(start),
        }),
        end: Some(ProgressiveRolloutStep {
            variation: Some("B".to_string()),
            percentage: Some(100.0),
            date: Some(start + Duration::days(1)),
        }),
    });
    assert_eq!(evaluate_rule(&rule, &input(&attrs), true), Ok(RuleOutcome::Matched("B")));
}

#[test]
fn rule_without_strategy_is_an_error() {
    let attrs = Map::new();
    let rule = Rule::default().named("empty");
    assert!(matches!(
        evaluate_rule(&rule, &input(&attrs), true),
        Err(RuleError::MissingStrategy { .. })
    ));
}

#[test]
fn bucketing_failures_surface_as_rule_errors() {
    let attrs = Map::new();
    let rule = Rule::split([("A", 0.0)]);
    assert_eq!(
        evaluate_rule(&rule, &input(&attrs), true),
        Err(RuleError::Bucketing(BucketingError::ZeroWidth))
    );
}

#[test]
fn dynamic_rules_are_detected() {
    assert!(!Rule::fixed("A").is_dynamic());
    assert!(Rule::split([("A", 40.0), ("B", 60.0)]).is_dynamic());
    assert!(!Rule::split([("A", 0.0), ("B", 100.0)]).is_dynamic());
    let rollout = Rule {
        progressive_rollout: Some(ProgressiveRollout::default()),
        ..Rule::default()
    };
    assert!(rollout.is_dynamic());
}

// ============================================================================
// SECTION: Merging
// ============================================================================

#[test]
fn merging_a_variation_replaces_other_strategies() {
    let mut rule = Rule::split([("A", 50.0), ("B", 50.0)]).named("main");
    rule.merge_from(&Rule::fixed("B").named("ignored"));
    assert_eq!(rule.variation.as_deref(), Some("B"));
    assert!(rule.percentage.is_none());
    assert_eq!(rule.name.as_deref(), Some("main"));
    assert_eq!(rule.strategy_count(), 1);
}

#[test]
fn merging_percentages_updates_entries_and_removes_markers() {
    let mut rule = Rule::split([("A", 50.0), ("B", 50.0)]);
    rule.merge_from(&Rule::split([("A", -1.0), ("B", 60.0), ("C", 40.0)]));
    let split = rule.percentage.expect("split");
    assert_eq!(split.len(), 2);
    assert_eq!(split.get("B"), Some(&60.0));
    assert_eq!(split.get("C"), Some(&40.0));
}

#[test]
fn merging_rollout_steps_merges_fields() {
    let start = instant("2026-01-01T00:00:00Z");
    let mut rule = Rule {
        progressive_rollout: Some(ProgressiveRollout {
            initial: Some(ProgressiveRolloutStep {
                variation: Some("A".to_string()),
                percentage: Some(0.0),
                date: Some(start),
            }),
            end: None,
        }),
        ..Rule::default()
    };
    let delta = Rule {
        progressive_rollout: Some(ProgressiveRollout {
            initial: Some(ProgressiveRolloutStep {
                percentage: Some(10.0),
                ..ProgressiveRolloutStep::default()
            }),
            end: Some(ProgressiveRolloutStep {
                variation: Some("B".to_string()),
                ..ProgressiveRolloutStep::default()
            }),
        }),
        ..Rule::default()
    };
    rule.merge_from(&delta);
    let rollout = rule.progressive_rollout.expect("rollout");
    let initial = rollout.initial.expect("initial");
    assert_eq!(initial.variation.as_deref(), Some("A"));
    assert_eq!(initial.percentage, Some(10.0));
    assert_eq!(initial.date, Some(start));
    assert_eq!(rollout.end.and_then(|end| end.variation).as_deref(), Some("B"));
}

#[test]
fn merging_replaces_query_and_disable() {
    let mut rule = Rule::fixed("A").when(query("beta eq true"));
    let delta = Rule {
        query: Some(query("beta eq false")),
        disable: Some(true),
        ..Rule::default()
    };
    rule.merge_from(&delta);
    assert_eq!(rule.query.as_ref().map(TargetingQuery::source), Some("beta eq false"));
    assert!(rule.is_disabled());
    assert_eq!(rule.variation.as_deref(), Some("A"));
}

#[test]
fn referenced_variations_cover_every_strategy() {
    let rule = Rule::split([("A", 50.0), ("B", 50.0)]);
    assert_eq!(rule.referenced_variations(), vec!["A", "B"]);
}
