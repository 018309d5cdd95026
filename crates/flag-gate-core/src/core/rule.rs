// crates/flag-gate-core/src/core/rule.rs
// ============================================================================
// Module: Flag Gate Rules
// Description: Targeting rules, resolution strategies, and rule merging.
// Purpose: Model how a rule selects a variation and how scheduled deltas edit it.
// Dependencies: crate::query, serde, time
// ============================================================================

//! ## Overview
//! A [`Rule`] pairs an optional targeting query with exactly one resolution
//! strategy: a fixed variation, a percentage split, or a progressive rollout.
//! Every field is optional so the same type also describes a partial rule
//! inside a scheduled step; [`Rule::merge_from`] overlays such a delta.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::query::TargetingQuery;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Percentage value that removes a variation from a split during a merge.
pub const REMOVE_PERCENTAGE: f64 = -1.0;

/// Percentage at which a single variation owns the whole split.
pub const FULL_PERCENTAGE: f64 = 100.0;

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Targeting rule or default rule.
///
/// # Invariants
/// - A validated rule sets exactly one of `variation`, `percentage`, and
///   `progressive_rollout`.
/// - `query` is absent only on the default rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule name, required for scheduled merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Targeting query deciding whether the rule applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<TargetingQuery>,
    /// Fixed variation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
    /// Variation name to percentage split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<BTreeMap<String, f64>>,
    /// Time-interpolated rollout between two variations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progressive_rollout: Option<ProgressiveRollout>,
    /// Disables the rule (ignored on the default rule).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
}

impl Rule {
    /// Creates a rule that always serves the given variation.
    #[must_use]
    pub fn fixed(variation: impl Into<String>) -> Self {
        Self {
            variation: Some(variation.into()),
            ..Self::default()
        }
    }

    /// Creates a rule that splits subjects by percentage.
    #[must_use]
    pub fn split<I, S>(percentages: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            percentage: Some(
                percentages.into_iter().map(|(name, value)| (name.into(), value)).collect(),
            ),
            ..Self::default()
        }
    }

    /// Sets the rule name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the targeting query.
    #[must_use]
    pub fn when(mut self, query: TargetingQuery) -> Self {
        self.query = Some(query);
        self
    }

    /// Returns true when the rule is explicitly disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    /// Returns true when the outcome depends on the subject key.
    ///
    /// Progressive rollouts are always dynamic; percentage splits are dynamic
    /// unless one variation holds the full 100%.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        if self.progressive_rollout.is_some() {
            return true;
        }
        self.percentage.as_ref().is_some_and(|split| {
            !split.is_empty() && !split.values().any(|value| is_full_percentage(*value))
        })
    }

    /// Counts the resolution strategies set on this rule.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        usize::from(self.variation.is_some())
            + usize::from(self.percentage.is_some())
            + usize::from(self.progressive_rollout.is_some())
    }

    /// Lists every variation name referenced by this rule.
    #[must_use]
    pub fn referenced_variations(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(variation) = &self.variation {
            names.push(variation.as_str());
        }
        if let Some(split) = &self.percentage {
            names.extend(split.keys().map(String::as_str));
        }
        if let Some(rollout) = &self.progressive_rollout {
            for step in [&rollout.initial, &rollout.end].into_iter().flatten() {
                if let Some(variation) = &step.variation {
                    names.push(variation.as_str());
                }
            }
        }
        names
    }

    // ========================================================================
    // SECTION: Merge
    // ========================================================================

    /// Overlays the fields present on `delta` onto this rule.
    ///
    /// Query and disable flags are replaced. Setting a strategy on the delta
    /// replaces the other strategies so the rule keeps exactly one. Percentage
    /// entries are merged per variation and [`REMOVE_PERCENTAGE`] deletes an
    /// entry. Progressive rollout steps are merged field by field. The rule
    /// name is never changed.
    pub fn merge_from(&mut self, delta: &Self) {
        if let Some(query) = &delta.query {
            self.query = Some(query.clone());
        }
        if let Some(disable) = delta.disable {
            self.disable = Some(disable);
        }

        if let Some(variation) = &delta.variation {
            self.variation = Some(variation.clone());
            self.percentage = None;
            self.progressive_rollout = None;
        }

        if let Some(delta_split) = &delta.percentage {
            let split = self.percentage.get_or_insert_with(BTreeMap::new);
            for (name, value) in delta_split {
                if is_remove_marker(*value) {
                    split.remove(name);
                } else {
                    split.insert(name.clone(), *value);
                }
            }
            self.variation = None;
            self.progressive_rollout = None;
        }

        if let Some(delta_rollout) = &delta.progressive_rollout {
            let rollout = self.progressive_rollout.get_or_insert_with(ProgressiveRollout::default);
            rollout.merge_from(delta_rollout);
            self.variation = None;
            self.percentage = None;
        }
    }
}

/// Returns true when a percentage equals [`FULL_PERCENTAGE`].
fn is_full_percentage(value: f64) -> bool {
    (value - FULL_PERCENTAGE).abs() < f64::EPSILON
}

/// Returns true when a percentage is the removal marker.
fn is_remove_marker(value: f64) -> bool {
    (value - REMOVE_PERCENTAGE).abs() < f64::EPSILON
}

// ============================================================================
// SECTION: Progressive Rollout
// ============================================================================

/// Linear rollout from one variation to another over a time window.
///
/// # Invariants
/// - A validated rollout has both steps with a variation and a date,
///   `end.date > initial.date`, and end percentage >= initial percentage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveRollout {
    /// Starting point of the rollout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<ProgressiveRolloutStep>,
    /// End point of the rollout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<ProgressiveRolloutStep>,
}

impl ProgressiveRollout {
    /// Overlays the fields present on `delta` onto this rollout.
    pub fn merge_from(&mut self, delta: &Self) {
        if let Some(initial) = &delta.initial {
            self.initial.get_or_insert_with(ProgressiveRolloutStep::default).merge_from(initial);
        }
        if let Some(end) = &delta.end {
            self.end.get_or_insert_with(ProgressiveRolloutStep::default).merge_from(end);
        }
    }
}

/// One end of a progressive rollout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveRolloutStep {
    /// Variation served at this end of the rollout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
    /// Percentage of subjects on the end variation at this point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Instant of this point.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<OffsetDateTime>,
}

impl ProgressiveRolloutStep {
    /// Overlays the fields present on `delta` onto this step.
    pub fn merge_from(&mut self, delta: &Self) {
        if let Some(variation) = &delta.variation {
            self.variation = Some(variation.clone());
        }
        if let Some(percentage) = delta.percentage {
            self.percentage = Some(percentage);
        }
        if let Some(date) = delta.date {
            self.date = Some(date);
        }
    }
}
