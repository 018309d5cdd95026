// crates/flag-gate-core/tests/evaluator.rs
// ============================================================================
// Module: Evaluator Tests
// Description: End-to-end flag evaluation through the catalog and clock.
// Purpose: Pin reasons, error codes, cacheability, and typed resolution.
// ============================================================================

//! ## Overview
//! Drives the evaluator end to end and checks the resolution it returns.

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

use std::sync::Arc;

use flag_gate_core::CatalogError;
use flag_gate_core::ErrorCode;
use flag_gate_core::EvaluationOptions;
use flag_gate_core::FixedClock;
use flag_gate_core::Flag;
use flag_gate_core::FlagCatalog;
use flag_gate_core::FlagEvaluator;
use flag_gate_core::InMemoryFlagCatalog;
use flag_gate_core::Reason;
use flag_gate_core::evaluate_flag;
use flag_logic::LogicMode;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::support::beta_flag;
use crate::support::context;
use crate::support::flag;
use crate::support::instant;
use crate::support::options;
use crate::support::static_flag;
use crate::support::subject_keys;
use crate::support::valid_flag;

const NOW: &str = "2026-03-01T12:00:00Z";

fn evaluator_with(
    flags: Vec<(&str, Flag)>,
) -> FlagEvaluator<InMemoryFlagCatalog, FixedClock> {
    let catalog = InMemoryFlagCatalog::new();
    catalog
        .replace_all(flags.into_iter().map(|(name, flag)| (name.to_string(), flag)).collect())
        .expect("catalog loads");
    FlagEvaluator::new(catalog, FixedClock::new(instant(NOW)))
}

fn split_flag() -> Flag {
    valid_flag(json!({
        "variations": { "A": "a", "B": "b" },
        "defaultRule": { "name": "split", "percentage": { "A": 50, "B": 50 } }
    }))
}

fn progressive_flag(start: OffsetDateTime) -> Flag {
    let end = start + Duration::hours(1);
    valid_flag(json!({
        "variations": { "A": "a", "B": "b" },
        "defaultRule": {
            "progressiveRollout": {
                "initial": { "variation": "A", "percentage": 0, "date": rfc3339(start) },
                "end": { "variation": "B", "percentage": 100, "date": rfc3339(end) }
            }
        }
    }))
}

fn rfc3339(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).expect("format instant")
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[test]
fn static_flag_resolves_fixed_variation() {
    let evaluator = evaluator_with(vec![("static", static_flag("A"))]);
    for key in ["alice", "bob", "user-99"] {
        let result = evaluator.evaluate("static", &context(key), &options(json!("fallback")));
        assert_eq!(result.value, json!("value-a"));
        assert_eq!(result.details.variant.as_deref(), Some("A"));
        assert_eq!(result.details.reason, Reason::Static);
        assert!(result.details.cacheable);
        assert!(!result.details.is_error());
    }
}

#[test]
fn even_split_over_many_subjects() {
    let evaluator = evaluator_with(vec![("split-flag", split_flag())]);
    let defaults = options(Value::Null);
    let mut on_b = 0;
    for key in subject_keys(10_000) {
        let result = evaluator.evaluate("split-flag", &context(&key), &defaults);
        assert_eq!(result.details.reason, Reason::Split);
        assert!(result.details.cacheable);
        if result.details.variant.as_deref() == Some("B") {
            on_b += 1;
        }
    }
    assert_eq!(on_b, 4998);
    assert!((4500 ..= 5500).contains(&on_b));
}

#[test]
fn disabled_flag_returns_caller_default() {
    let mut disabled = static_flag("A");
    disabled.disable = Some(true);
    let evaluator = evaluator_with(vec![("off", disabled)]);
    let result = evaluator.evaluate("off", &context("alice"), &options(json!("fallback")));
    assert_eq!(result.value, json!("fallback"));
    assert_eq!(result.details.reason, Reason::Disabled);
    assert!(result.details.error_code.is_none());
    assert!(result.details.variant.is_none());
    assert!(result.details.cacheable);
}

#[test]
fn progressive_rollout_midpoint_splits_subjects() {
    let start = instant(NOW);
    let evaluator = evaluator_with(vec![("progressive-flag", progressive_flag(start))]);
    let at = start + Duration::minutes(30);
    let defaults = options(Value::Null);
    let mut on_b = 0;
    for key in subject_keys(10_000) {
        let result = evaluator.evaluate("progressive-flag", &context(&key).at(at), &defaults);
        assert_eq!(result.details.reason, Reason::Split);
        assert!(!result.details.cacheable);
        if result.value == json!("b") {
            on_b += 1;
        }
    }
    assert_eq!(on_b, 4956);
}

#[test]
fn only_elapsed_scheduled_steps_are_applied() {
    let scheduled = valid_flag(json!({
        "variations": { "A": "a", "B": "b", "C": "c" },
        "defaultRule": { "variation": "A" },
        "scheduledRollout": [
            { "date": "2026-01-01T00:00:00Z", "defaultRule": { "variation": "C" } },
            { "date": "2026-12-01T00:00:00Z", "defaultRule": { "variation": "B" } }
        ]
    }));
    let evaluator = evaluator_with(vec![("scheduled", scheduled)]);
    let result = evaluator.evaluate("scheduled", &context("alice"), &options(Value::Null));
    assert_eq!(result.value, json!("c"));
    assert_eq!(result.details.reason, Reason::Static);
    assert!(!result.details.cacheable);

    let later = context("alice").at(instant("2026-12-02T00:00:00Z"));
    assert_eq!(evaluator.evaluate("scheduled", &later, &options(Value::Null)).value, json!("b"));

    let earlier = context("alice").at(instant("2025-12-31T00:00:00Z"));
    assert_eq!(evaluator.evaluate("scheduled", &earlier, &options(Value::Null)).value, json!("a"));
}

#[test]
fn empty_subject_key_is_reported() {
    let evaluator = evaluator_with(vec![("static", static_flag("A"))]);
    let result = evaluator.evaluate("static", &context(""), &options(json!("fallback")));
    assert_eq!(result.value, json!("fallback"));
    assert_eq!(result.details.reason, Reason::Error);
    assert_eq!(result.details.error_code, Some(ErrorCode::TargetingKeyMissing));
    assert!(result.details.variant.is_none());
}

// ============================================================================
// SECTION: Reasons
// ============================================================================

#[test]
fn targeting_match_and_default_reasons() {
    let evaluator = evaluator_with(vec![("beta", beta_flag())]);
    let defaults = EvaluationOptions::new(false);

    let matched = evaluator.evaluate_bool("beta", &context("alice").with_attribute("beta", true), &defaults);
    assert!(matched.value);
    assert_eq!(matched.details.reason, Reason::TargetingMatch);
    assert_eq!(matched.details.rule_index, Some(0));
    assert_eq!(matched.details.rule_name.as_deref(), Some("beta"));

    let fallback = evaluator.evaluate_bool("beta", &context("alice"), &defaults);
    assert!(!fallback.value);
    assert_eq!(fallback.details.reason, Reason::Default);
    assert_eq!(fallback.details.rule_index, None);
    assert_eq!(fallback.details.rule_name.as_deref(), Some("fallback"));
    assert_eq!(fallback.details.variant.as_deref(), Some("disabled"));
}

#[test]
fn targeting_split_reason() {
    let flag = valid_flag(json!({
        "variations": { "A": "a", "B": "b" },
        "targeting": [
            { "name": "pros", "query": "plan eq \"pro\"", "percentage": { "A": 50, "B": 50 } }
        ],
        "defaultRule": { "variation": "A" }
    }));
    let evaluator = evaluator_with(vec![("split-flag", flag)]);
    let result = evaluator.evaluate(
        "split-flag",
        &context("alice").with_attribute("plan", "pro"),
        &options(Value::Null),
    );
    assert_eq!(result.details.reason, Reason::TargetingMatchSplit);
    assert_eq!(result.details.variant.as_deref(), Some("A"));
    assert_eq!(result.details.rule_index, Some(0));
}

#[test]
fn full_weight_split_is_not_dynamic() {
    let flag = valid_flag(json!({
        "variations": { "A": "a", "B": "b" },
        "defaultRule": { "percentage": { "A": 0, "B": 100 } }
    }));
    let evaluator = evaluator_with(vec![("full", flag)]);
    let result = evaluator.evaluate("full", &context("alice"), &options(Value::Null));
    assert_eq!(result.details.reason, Reason::Static);
    assert_eq!(result.value, json!("b"));
}

#[test]
fn experimentation_window_gates_evaluation() {
    let flag = valid_flag(json!({
        "variations": { "A": "a" },
        "defaultRule": { "variation": "A" },
        "experimentation": { "start": "2026-02-01T00:00:00Z", "end": "2026-02-28T00:00:00Z" }
    }));
    let evaluator = evaluator_with(vec![("experiment", flag)]);

    let outside = evaluator.evaluate("experiment", &context("alice"), &options(json!("fallback")));
    assert_eq!(outside.value, json!("fallback"));
    assert_eq!(outside.details.reason, Reason::Disabled);
    assert!(!outside.details.cacheable);

    let inside = context("alice").at(instant("2026-02-10T00:00:00Z"));
    let result = evaluator.evaluate("experiment", &inside, &options(json!("fallback")));
    assert_eq!(result.value, json!("a"));
    assert_eq!(result.details.reason, Reason::Static);
    assert!(!result.details.cacheable);
}

#[test]
fn disabled_rule_falls_through() {
    let flag = valid_flag(json!({
        "variations": { "on": true, "off": false },
        "targeting": [
            { "name": "everyone", "query": "", "variation": "on", "disable": true }
        ],
        "defaultRule": { "variation": "off" }
    }));
    let evaluator = evaluator_with(vec![("flag", flag)]);
    let result = evaluator.evaluate_bool("flag", &context("alice"), &EvaluationOptions::new(true));
    assert!(!result.value);
    assert_eq!(result.details.reason, Reason::Default);
}

// ============================================================================
// SECTION: Error Codes
// ============================================================================

#[test]
fn unloaded_catalog_is_not_ready() {
    let evaluator = FlagEvaluator::new(InMemoryFlagCatalog::new(), FixedClock::new(instant(NOW)));
    let result = evaluator.evaluate("any", &context("alice"), &options(json!(7)));
    assert_eq!(result.value, json!(7));
    assert_eq!(result.details.error_code, Some(ErrorCode::ProviderNotReady));
}

#[test]
fn unknown_flag_is_not_found() {
    let evaluator = evaluator_with(vec![]);
    let result = evaluator.evaluate("missing", &context("alice"), &options(json!(7)));
    assert_eq!(result.value, json!(7));
    assert_eq!(result.details.reason, Reason::Error);
    assert_eq!(result.details.error_code, Some(ErrorCode::FlagNotFound));
    assert!(result.details.error_message.is_some());
}

#[test]
fn requested_type_mismatch_is_reported() {
    let mut flag = static_flag("A");
    flag.version = Some("7".to_string());
    flag.track_events = Some(false);
    let evaluator = evaluator_with(vec![("static", flag)]);
    let result = evaluator.evaluate_bool("static", &context("alice"), &EvaluationOptions::new(true));
    assert!(result.value);
    assert_eq!(result.details.error_code, Some(ErrorCode::TypeMismatch));
    assert_eq!(result.details.version.as_deref(), Some("7"));
    assert!(!result.details.track_events);
}

#[test]
fn bucketing_attribute_replaces_subject_key() {
    let flag = valid_flag(json!({
        "variations": { "A": "a", "B": "b" },
        "bucketingKey": "teamId",
        "defaultRule": { "percentage": { "A": 50, "B": 50 } }
    }));
    let evaluator = evaluator_with(vec![("split-flag", flag)]);
    let defaults = options(json!("fallback"));

    let team = evaluator.evaluate("split-flag", &context("").with_attribute("teamId", "carol"), &defaults);
    assert!(!team.details.is_error());
    assert_eq!(team.value, json!("b"));

    let missing = evaluator.evaluate("split-flag", &context("alice"), &defaults);
    assert_eq!(missing.details.error_code, Some(ErrorCode::TargetingKeyMissing));

    let empty = evaluator.evaluate("split-flag", &context("alice").with_attribute("teamId", ""), &defaults);
    assert_eq!(empty.details.error_code, Some(ErrorCode::TargetingKeyMissing));

    let numeric = evaluator.evaluate("split-flag", &context("alice").with_attribute("teamId", 42), &defaults);
    assert_eq!(numeric.details.error_code, Some(ErrorCode::InvalidContext));
    assert_eq!(numeric.value, json!("fallback"));
}

#[test]
fn broken_definitions_report_flag_config() {
    let now = instant(NOW);
    let defaults = options(json!("fallback"));

    let no_default = flag(json!({ "variations": { "A": "a" } }));
    let result = evaluate_flag("broken", &no_default, &context("alice"), &defaults, now, LogicMode::Kleene);
    assert_eq!(result.details.error_code, Some(ErrorCode::FlagConfig));
    assert_eq!(result.value, json!("fallback"));

    let unknown_variation = flag(json!({
        "variations": { "A": "a" },
        "defaultRule": { "variation": "Z" }
    }));
    let result =
        evaluate_flag("broken", &unknown_variation, &context("alice"), &defaults, now, LogicMode::Kleene);
    assert_eq!(result.details.error_code, Some(ErrorCode::FlagConfig));

    let zero_split = flag(json!({
        "variations": { "A": "a" },
        "defaultRule": { "percentage": { "A": 0 } }
    }));
    let result = evaluate_flag("broken", &zero_split, &context("alice"), &defaults, now, LogicMode::Kleene);
    assert_eq!(result.details.error_code, Some(ErrorCode::FlagConfig));
}

#[test]
fn undated_scheduled_step_reports_general() {
    let undated = flag(json!({
        "variations": { "A": "a" },
        "defaultRule": { "variation": "A" },
        "scheduledRollout": [ { "disable": true } ]
    }));
    let result = evaluate_flag(
        "undated",
        &undated,
        &context("alice"),
        &options(Value::Null),
        instant(NOW),
        LogicMode::Kleene,
    );
    assert_eq!(result.details.error_code, Some(ErrorCode::General));
}

/// Catalog whose storage always fails.
struct FailingCatalog;

impl FlagCatalog for FailingCatalog {
    fn is_ready(&self) -> bool {
        true
    }

    fn get(&self, _name: &str) -> Result<Option<Arc<Flag>>, CatalogError> {
        Err(CatalogError::Store("backend offline".to_string()))
    }
}

#[test]
fn catalog_failures_map_to_general() {
    let evaluator = FlagEvaluator::new(FailingCatalog, FixedClock::new(instant(NOW)));
    let result = evaluator.evaluate("any", &context("alice"), &options(json!(false)));
    assert_eq!(result.details.error_code, Some(ErrorCode::General));
    assert_eq!(result.value, json!(false));
}

// ============================================================================
// SECTION: Typed Resolution
// ============================================================================

#[test]
fn typed_helpers_convert_values() {
    let evaluator = evaluator_with(vec![
        ("string", valid_flag(json!({"variations": {"v": "text"}, "defaultRule": {"variation": "v"}}))),
        ("int", valid_flag(json!({"variations": {"v": 42}, "defaultRule": {"variation": "v"}}))),
        ("float", valid_flag(json!({"variations": {"v": 0.25}, "defaultRule": {"variation": "v"}}))),
        ("object", valid_flag(json!({"variations": {"v": {"color": "red"}}, "defaultRule": {"variation": "v"}}))),
    ]);
    let alice = context("alice");

    let text = evaluator.evaluate_string("string", &alice, &EvaluationOptions::new(String::new()));
    assert_eq!(text.value, "text");

    let int = evaluator.evaluate_int("int", &alice, &EvaluationOptions::new(0));
    assert_eq!(int.value, 42);

    let float = evaluator.evaluate_float("float", &alice, &EvaluationOptions::new(0.0));
    assert!((float.value - 0.25).abs() < f64::EPSILON);

    let object = evaluator.evaluate_object("object", &alice, &EvaluationOptions::new(Map::new()));
    assert_eq!(object.value.get("color"), Some(&json!("red")));

    let not_an_int = evaluator.evaluate_int("float", &alice, &EvaluationOptions::new(-1));
    assert_eq!(not_an_int.value, -1);
    assert_eq!(not_an_int.details.error_code, Some(ErrorCode::TypeMismatch));
}

// ============================================================================
// SECTION: Context Handling
// ============================================================================

#[test]
fn enrichment_attributes_are_visible_to_queries() {
    let evaluator = evaluator_with(vec![("beta", beta_flag())]);
    let enriched = EvaluationOptions::new(false).with_enrichment("beta", true);
    let result = evaluator.evaluate_bool("beta", &context("alice"), &enriched);
    assert!(result.value);

    let overridden = evaluator.evaluate_bool("beta", &context("alice").with_attribute("beta", false), &enriched);
    assert!(!overridden.value);
}

#[test]
fn bochvar_logic_treats_unknown_as_infectious() {
    let flag = valid_flag(json!({
        "variations": { "on": true, "off": false },
        "targeting": [
            { "name": "either", "query": "plan eq \"pro\" or beta eq true", "variation": "on" }
        ],
        "defaultRule": { "variation": "off" }
    }));
    let ctx = context("alice").with_attribute("beta", true);
    let defaults = EvaluationOptions::new(false);

    let kleene = evaluator_with(vec![("flag", flag.clone())]);
    assert!(kleene.evaluate_bool("flag", &ctx, &defaults).value);

    let bochvar = evaluator_with(vec![("flag", flag)]).with_logic(LogicMode::Bochvar);
    assert!(!bochvar.evaluate_bool("flag", &ctx, &defaults).value);
}

#[test]
fn flag_metadata_is_copied_into_details() {
    let flag = valid_flag(json!({
        "variations": { "A": "a" },
        "defaultRule": { "variation": "A" },
        "version": "2026.03",
        "trackEvents": false,
        "metadata": { "owner": "growth" }
    }));
    let evaluator = evaluator_with(vec![("meta", flag)]);
    let result = evaluator.evaluate("meta", &context("alice"), &options(Value::Null));
    assert_eq!(result.details.version.as_deref(), Some("2026.03"));
    assert!(!result.details.track_events);
    assert_eq!(result.details.metadata.as_ref().and_then(|meta| meta.get("owner")), Some(&json!("growth")));
}

#[test]
fn resolution_details_use_wire_names() {
    let evaluator = evaluator_with(vec![("beta", beta_flag())]);
    let result = evaluator.evaluate("beta", &context("alice").with_attribute("beta", true), &options(Value::Null));
    let encoded = serde_json::to_value(&result.details).expect("serialize");
    assert_eq!(encoded["reason"], json!("TARGETING_MATCH"));
    assert_eq!(encoded["variant"], json!("enabled"));
    assert_eq!(encoded["ruleIndex"], json!(0));
    assert!(encoded.get("errorCode").is_none());

    let missing = evaluator.evaluate("nope", &context("alice"), &options(Value::Null));
    let encoded = serde_json::to_value(&missing.details).expect("serialize");
    assert_eq!(encoded["errorCode"], json!("FLAG_NOT_FOUND"));
    assert_eq!(encoded["reason"], json!("ERROR"));
}
