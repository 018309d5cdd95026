// crates/flag-gate-core/src/core/flag.rs
// ============================================================================
// Module: Flag Gate Flag Definitions
// Description: Flag model, scheduled steps, structural validation, and merging.
// Purpose: Define the canonical flag definition and reject malformed ones at load.
// Dependencies: crate::core::{hashing, limits, rule}, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! A [`Flag`] is the full definition of one feature flag. Every field is
//! optional because the same type doubles as the delta carried by a
//! [`ScheduledStep`]: absent means "unchanged", not "false".
//!
//! [`Flag::validate`] is the single load-time gate. A flag that passes it can
//! still fail at evaluation (for example a missing subject key) but never
//! because of its own structure, including every state its scheduled steps
//! can produce.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::limits::ValidationLimits;
use crate::core::resolution::ErrorCode;
use crate::core::rule::FULL_PERCENTAGE;
use crate::core::rule::ProgressiveRollout;
use crate::core::rule::Rule;
use crate::query::QueryError;

// ============================================================================
// SECTION: Flag
// ============================================================================

/// Feature flag definition.
///
/// # Invariants
/// - A validated flag has at least one variation and a default rule.
/// - Variation values share one JSON type.
/// - Rule names are unique and every referenced variation exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Variation name to value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<BTreeMap<String, Value>>,
    /// Ordered targeting rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Vec<Rule>>,
    /// Rule applied when no targeting rule matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rule: Option<Rule>,
    /// Context attribute hashed instead of the subject key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucketing_key: Option<String>,
    /// Window outside of which the flag serves the caller's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimentation: Option<ExperimentationRollout>,
    /// Time-gated changes applied in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_rollout: Option<Vec<ScheduledStep>>,
    /// Whether evaluation events should be tracked (default true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_events: Option<bool>,
    /// Whether the flag is disabled (default false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Free-form version label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form metadata copied into every resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Flag {
    /// Returns true when the flag is explicitly disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    /// Returns whether evaluation events should be tracked.
    #[must_use]
    pub fn tracks_events(&self) -> bool {
        self.track_events.unwrap_or(true)
    }

    /// Returns the targeting rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        self.targeting.as_deref().unwrap_or_default()
    }

    /// Returns the scheduled steps in declaration order.
    #[must_use]
    pub fn scheduled_steps(&self) -> &[ScheduledStep] {
        self.scheduled_rollout.as_deref().unwrap_or_default()
    }

    /// Looks up a variation value by name.
    #[must_use]
    pub fn variation(&self, name: &str) -> Option<&Value> {
        self.variations.as_ref().and_then(|variations| variations.get(name))
    }

    /// Returns true when the outcome can change over time without a reload.
    #[must_use]
    pub fn has_time_dynamics(&self) -> bool {
        !self.scheduled_steps().is_empty() || self.experimentation.is_some()
    }

    /// Returns true when `now` falls outside the experimentation window.
    #[must_use]
    pub fn is_outside_experimentation(&self, now: OffsetDateTime) -> bool {
        let Some(window) = &self.experimentation else {
            return false;
        };
        window.start.is_some_and(|start| now < start) || window.end.is_some_and(|end| now > end)
    }

    /// Computes the canonical fingerprint of this definition.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn fingerprint(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    // ========================================================================
    // SECTION: Change Overlay
    // ========================================================================

    /// Overlays the fields present on a scheduled-step delta onto this flag.
    ///
    /// Named rules are merged into the rule with the same name or appended.
    /// Unnamed rules are appended unless an identical rule is already present.
    /// Variations are added or replaced, never removed. The delta's own
    /// scheduled steps, bucketing key, and metadata are ignored.
    pub fn apply_changes(&mut self, delta: &Self) {
        if let Some(disable) = delta.disable {
            self.disable = Some(disable);
        }
        if let Some(track_events) = delta.track_events {
            self.track_events = Some(track_events);
        }
        if let Some(version) = &delta.version {
            self.version = Some(version.clone());
        }

        if let Some(delta_rules) = &delta.targeting {
            let rules = self.targeting.get_or_insert_with(Vec::new);
            for delta_rule in delta_rules {
                merge_rule_into(rules, delta_rule);
            }
        }

        if let Some(delta_default) = &delta.default_rule {
            match &mut self.default_rule {
                Some(default_rule) => default_rule.merge_from(delta_default),
                None => self.default_rule = Some(delta_default.clone()),
            }
        }

        if let Some(delta_variations) = &delta.variations {
            let variations = self.variations.get_or_insert_with(BTreeMap::new);
            for (name, value) in delta_variations {
                variations.insert(name.clone(), value.clone());
            }
        }

        if let Some(delta_window) = &delta.experimentation {
            let window = self.experimentation.get_or_insert_with(ExperimentationRollout::default);
            if let Some(start) = delta_window.start {
                window.start = Some(start);
            }
            if let Some(end) = delta_window.end {
                window.end = Some(end);
            }
        }
    }

    // ========================================================================
    // SECTION: Validation
    // ========================================================================

    /// Validates the flag and every state its scheduled steps can produce.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError`] describing the first structural problem found.
    pub fn validate(&self, limits: &ValidationLimits) -> Result<(), FlagError> {
        self.validate_structure(limits)?;
        self.validate_schedule(limits)
    }

    /// Validates the flag as it stands, ignoring its scheduled steps.
    fn validate_structure(&self, limits: &ValidationLimits) -> Result<(), FlagError> {
        let variations = match &self.variations {
            Some(variations) if !variations.is_empty() => variations,
            _ => return Err(FlagError::MissingVariations),
        };
        if variations.len() > limits.max_variations {
            return Err(FlagError::TooManyVariations {
                max: limits.max_variations,
                actual: variations.len(),
            });
        }
        ensure_uniform_variation_types(variations)?;

        let Some(default_rule) = &self.default_rule else {
            return Err(FlagError::MissingDefaultRule);
        };
        let rules = self.rules();
        if rules.len() > limits.max_rules {
            return Err(FlagError::TooManyRules {
                max: limits.max_rules,
                actual: rules.len(),
            });
        }
        ensure_unique_rule_names(rules, default_rule)?;

        for (index, rule) in rules.iter().enumerate() {
            let label = rule_label(rule, Some(index));
            validate_rule(rule, &label, false, variations, limits)?;
        }
        validate_rule(default_rule, &rule_label(default_rule, None), true, variations, limits)?;

        if let Some(window) = &self.experimentation
            && let (Some(start), Some(end)) = (window.start, window.end)
            && end <= start
        {
            return Err(FlagError::InvalidExperimentation);
        }
        Ok(())
    }

    /// Validates every effective flag reachable through the scheduled steps.
    ///
    /// The reachable states are the base flag plus, for each distinct step
    /// date, the flag with every step dated on or before it applied in
    /// declaration order.
    fn validate_schedule(&self, limits: &ValidationLimits) -> Result<(), FlagError> {
        let steps = self.scheduled_steps();
        if steps.is_empty() {
            return Ok(());
        }
        if steps.len() > limits.max_scheduled_steps {
            return Err(FlagError::TooManyScheduledSteps {
                max: limits.max_scheduled_steps,
                actual: steps.len(),
            });
        }

        let mut dates = BTreeSet::new();
        for (index, step) in steps.iter().enumerate() {
            let date = step.date.ok_or(FlagError::MissingStepDate(index))?;
            dates.insert(date);
        }

        for cutoff in dates {
            let mut staged = self.clone();
            for step in steps {
                if step.date.is_some_and(|date| date <= cutoff) {
                    staged.apply_changes(&step.changes);
                }
            }
            staged.validate_structure(limits).map_err(|source| FlagError::InvalidScheduledState {
                at: format_instant(cutoff),
                source: Box::new(source),
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Experimentation
// ============================================================================

/// Time window during which the flag is evaluated normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentationRollout {
    /// Start of the window (inclusive).
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<OffsetDateTime>,
    /// End of the window (inclusive).
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<OffsetDateTime>,
}

// ============================================================================
// SECTION: Scheduled Steps
// ============================================================================

/// Partial flag applied once its date has passed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledStep {
    /// Fields to overlay onto the flag.
    #[serde(flatten)]
    pub changes: Flag,
    /// Activation instant.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<OffsetDateTime>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural validation errors for flag definitions.
#[derive(Debug, Error)]
pub enum FlagError {
    /// The flag defines no variations.
    #[error("flag must define at least one variation")]
    MissingVariations,
    /// Too many variations.
    #[error("flag defines {actual} variations (max {max})")]
    TooManyVariations {
        /// Configured maximum.
        max: usize,
        /// Actual count.
        actual: usize,
    },
    /// Variation values have different JSON types.
    #[error("variation {variation} is {found} but other variations are {expected}")]
    MixedVariationTypes {
        /// Offending variation.
        variation: String,
        /// JSON type of the first variation.
        expected: &'static str,
        /// JSON type of the offending variation.
        found: &'static str,
    },
    /// The flag has no default rule.
    #[error("flag must define a default rule")]
    MissingDefaultRule,
    /// Too many targeting rules.
    #[error("flag defines {actual} targeting rules (max {max})")]
    TooManyRules {
        /// Configured maximum.
        max: usize,
        /// Actual count.
        actual: usize,
    },
    /// Two rules share a name.
    #[error("duplicate rule name: {0}")]
    DuplicateRuleName(String),
    /// A targeting rule has no query.
    #[error("{0} must define a query")]
    MissingQuery(String),
    /// A targeting query violates the configured limits.
    #[error("{rule} has an invalid query: {source}")]
    InvalidQuery {
        /// Rule label.
        rule: String,
        /// Underlying query error.
        source: QueryError,
    },
    /// A rule does not set exactly one resolution strategy.
    #[error("{rule} must set exactly one of variation, percentage, progressiveRollout (found {count})")]
    StrategyCount {
        /// Rule label.
        rule: String,
        /// Number of strategies set.
        count: usize,
    },
    /// A rule references a variation that does not exist.
    #[error("{rule} references unknown variation {variation}")]
    UnknownVariation {
        /// Rule label.
        rule: String,
        /// Missing variation name.
        variation: String,
    },
    /// A percentage split is malformed.
    #[error("{rule} has an invalid percentage split: {reason}")]
    InvalidPercentage {
        /// Rule label.
        rule: String,
        /// Description of the problem.
        reason: String,
    },
    /// A progressive rollout is malformed.
    #[error("{rule} has an invalid progressive rollout: {reason}")]
    InvalidProgressiveRollout {
        /// Rule label.
        rule: String,
        /// Description of the problem.
        reason: String,
    },
    /// The experimentation window ends before it starts.
    #[error("experimentation end must be after start")]
    InvalidExperimentation,
    /// Too many scheduled steps.
    #[error("flag defines {actual} scheduled steps (max {max})")]
    TooManyScheduledSteps {
        /// Configured maximum.
        max: usize,
        /// Actual count.
        actual: usize,
    },
    /// A scheduled step has no date.
    #[error("scheduled step {0} must define a date")]
    MissingStepDate(usize),
    /// A state produced by the scheduled steps is invalid.
    #[error("scheduled rollout state at {at} is invalid: {source}")]
    InvalidScheduledState {
        /// Cutoff instant of the invalid state.
        at: String,
        /// Underlying validation error.
        source: Box<Self>,
    },
}

impl FlagError {
    /// Returns the evaluation error code for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::FlagConfig
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures every variation value has the same JSON type.
fn ensure_uniform_variation_types(variations: &BTreeMap<String, Value>) -> Result<(), FlagError> {
    let mut expected: Option<&'static str> = None;
    for (name, value) in variations {
        let kind = json_kind(value);
        match expected {
            None => expected = Some(kind),
            Some(expected) if expected != kind => {
                return Err(FlagError::MixedVariationTypes {
                    variation: name.clone(),
                    expected,
                    found: kind,
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Ensures rule names are unique across targeting rules and the default rule.
fn ensure_unique_rule_names(rules: &[Rule], default_rule: &Rule) -> Result<(), FlagError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for rule in rules.iter().chain(std::iter::once(default_rule)) {
        if let Some(name) = rule.name.as_deref()
            && !seen.insert(name)
        {
            return Err(FlagError::DuplicateRuleName(name.to_string()));
        }
    }
    Ok(())
}

/// Validates one rule against the flag's variations and limits.
fn validate_rule(
    rule: &Rule,
    label: &str,
    is_default: bool,
    variations: &BTreeMap<String, Value>,
    limits: &ValidationLimits,
) -> Result<(), FlagError> {
    match &rule.query {
        Some(query) => query.check_limits(&limits.query).map_err(|source| {
            FlagError::InvalidQuery {
                rule: label.to_string(),
                source,
            }
        })?,
        None if !is_default => return Err(FlagError::MissingQuery(label.to_string())),
        None => {}
    }

    let count = rule.strategy_count();
    if count != 1 {
        return Err(FlagError::StrategyCount {
            rule: label.to_string(),
            count,
        });
    }

    for variation in rule.referenced_variations() {
        if !variations.contains_key(variation) {
            return Err(FlagError::UnknownVariation {
                rule: label.to_string(),
                variation: variation.to_string(),
            });
        }
    }

    if let Some(split) = &rule.percentage {
        validate_percentages(split, limits.require_full_percentage).map_err(|reason| {
            FlagError::InvalidPercentage {
                rule: label.to_string(),
                reason,
            }
        })?;
    }
    if let Some(rollout) = &rule.progressive_rollout {
        validate_rollout(rollout).map_err(|reason| FlagError::InvalidProgressiveRollout {
            rule: label.to_string(),
            reason,
        })?;
    }
    Ok(())
}

/// Checks a percentage split for finite, bounded, non-empty weights.
fn validate_percentages(split: &BTreeMap<String, f64>, require_full: bool) -> Result<(), String> {
    if split.is_empty() {
        return Err("split is empty".to_string());
    }
    let mut total = 0.0;
    for (name, value) in split {
        if !value.is_finite() || *value < 0.0 || *value > FULL_PERCENTAGE {
            return Err(format!("{name} has percentage {value}, expected 0 to 100"));
        }
        total += value;
    }
    if total <= 0.0 {
        return Err("percentages sum to zero".to_string());
    }
    if total > FULL_PERCENTAGE + PERCENTAGE_TOLERANCE {
        return Err(format!("percentages sum to {total}, expected at most 100"));
    }
    if require_full && (total - FULL_PERCENTAGE).abs() > PERCENTAGE_TOLERANCE {
        return Err(format!("percentages sum to {total}, expected exactly 100"));
    }
    Ok(())
}

/// Tolerance used when comparing percentage totals.
const PERCENTAGE_TOLERANCE: f64 = 1e-9;

/// Checks a progressive rollout for complete, ordered end points.
fn validate_rollout(rollout: &ProgressiveRollout) -> Result<(), String> {
    let (Some(initial), Some(end)) = (&rollout.initial, &rollout.end) else {
        return Err("initial and end steps are required".to_string());
    };
    if initial.variation.is_none() || end.variation.is_none() {
        return Err("initial and end steps must name a variation".to_string());
    }
    let (Some(initial_date), Some(end_date)) = (initial.date, end.date) else {
        return Err("initial and end steps must define a date".to_string());
    };
    if end_date <= initial_date {
        return Err("end date must be after initial date".to_string());
    }
    let initial_percentage = initial.percentage.unwrap_or(0.0);
    let end_percentage = end.percentage.unwrap_or(FULL_PERCENTAGE);
    for value in [initial_percentage, end_percentage] {
        if !value.is_finite() || !(0.0 ..= FULL_PERCENTAGE).contains(&value) {
            return Err(format!("percentage {value} is outside 0 to 100"));
        }
    }
    if end_percentage < initial_percentage {
        return Err("end percentage must not be below initial percentage".to_string());
    }
    Ok(())
}

/// Builds a human-readable rule label for diagnostics.
fn rule_label(rule: &Rule, index: Option<usize>) -> String {
    match (&rule.name, index) {
        (Some(name), _) => format!("rule {name}"),
        (None, Some(index)) => format!("rule #{index}"),
        (None, None) => "default rule".to_string(),
    }
}

/// Merges a step rule into the rule list by name.
fn merge_rule_into(rules: &mut Vec<Rule>, delta: &Rule) {
    if let Some(name) = delta.name.as_deref() {
        if let Some(existing) = rules.iter_mut().find(|rule| rule.name.as_deref() == Some(name)) {
            existing.merge_from(delta);
        } else {
            rules.push(delta.clone());
        }
    } else if !rules.contains(delta) {
        rules.push(delta.clone());
    }
}

/// Returns the JSON type name of a value.
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Formats an instant as RFC 3339 for diagnostics.
fn format_instant(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).unwrap_or_else(|_| instant.unix_timestamp().to_string())
}
