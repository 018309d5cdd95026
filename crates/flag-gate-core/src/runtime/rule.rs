// crates/flag-gate-core/src/runtime/rule.rs
// ============================================================================
// Module: Flag Gate Rule Evaluation
// Description: Applies one rule to one subject.
// Purpose: Decide whether a rule applies and which variation it selects.
// Dependencies: crate::{core, query, runtime::bucketing}, flag-logic, thiserror, time
// ============================================================================

//! ## Overview
//! A rule either does not apply ([`RuleOutcome::NotApplicable`], the signal to
//! try the next rule) or selects a variation. Hard failures are
//! [`RuleError`]s and abort evaluation.
//!
//! Non-default rules apply when they are enabled and their query evaluates to
//! `True`. The default rule always applies. Strategy precedence is
//! progressive rollout, then percentage split, then fixed variation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flag_logic::LogicMode;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::rule::Rule;
use crate::query::AttributeView;
use crate::runtime::bucketing::BucketingError;
use crate::runtime::bucketing::evaluate_percentage;
use crate::runtime::bucketing::evaluate_progressive;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-evaluation inputs shared by every rule of a flag.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// Flag name, part of the hash input.
    pub flag_name: &'a str,
    /// Subject key (or bucketing attribute value) hashed for splits.
    pub bucketing_key: &'a str,
    /// Attributes visible to targeting queries.
    pub view: AttributeView<'a>,
    /// Evaluation instant.
    pub now: OffsetDateTime,
    /// Tri-state logic used for queries.
    pub logic: LogicMode,
}

/// Result of applying a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome<'r> {
    /// The rule applies and selected this variation.
    Matched(&'r str),
    /// The rule does not apply; try the next one.
    NotApplicable,
}

/// Hard rule evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule sets no resolution strategy.
    #[error("{rule} has no variation, percentage, or progressive rollout")]
    MissingStrategy {
        /// Rule label.
        rule: String,
    },
    /// Bucketing failed.
    #[error(transparent)]
    Bucketing(#[from] BucketingError),
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Applies a rule to the subject described by `input`.
///
/// # Errors
///
/// Returns [`RuleError`] when the rule has no strategy or bucketing fails.
pub fn evaluate_rule<'r>(
    rule: &'r Rule,
    input: &RuleInput<'_>,
    is_default: bool,
) -> Result<RuleOutcome<'r>, RuleError> {
    if !is_default {
        if rule.is_disabled() {
            return Ok(RuleOutcome::NotApplicable);
        }
        if let Some(query) = &rule.query
            && !query.matches(&input.view, &input.logic)
        {
            return Ok(RuleOutcome::NotApplicable);
        }
    }

    if let Some(rollout) = &rule.progressive_rollout {
        let variation =
            evaluate_progressive(rollout, input.flag_name, input.bucketing_key, input.now)?;
        return Ok(RuleOutcome::Matched(variation));
    }
    if let Some(split) = &rule.percentage {
        let variation = evaluate_percentage(split, input.flag_name, input.bucketing_key)?;
        return Ok(RuleOutcome::Matched(variation));
    }
    if let Some(variation) = &rule.variation {
        return Ok(RuleOutcome::Matched(variation.as_str()));
    }
    Err(RuleError::MissingStrategy {
        rule: rule.name.as_deref().map_or_else(|| "unnamed rule".to_string(), |name| format!("rule {name}")),
    })
}
