// crates/flag-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Flag Gate Evaluation Orchestrator
// Description: Top-level flag evaluation state machine.
// Purpose: Resolve a flag for a context into a value plus resolution details.
// Dependencies: crate::{core, interfaces, query, runtime}, flag-logic, serde_json, time, tracing
// ============================================================================

//! ## Overview
//! Evaluation is a single pass:
//! 1. resolve the effective flag for the evaluation instant;
//! 2. determine the bucketing key;
//! 3. short-circuit disabled flags and instants outside the experimentation
//!    window;
//! 4. try targeting rules in order, then the default rule;
//! 5. classify the reason and cacheability.
//!
//! Every failure degrades to the caller's default value with
//! [`Reason::Error`] and an [`ErrorCode`]; evaluation never panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flag_logic::LogicMode;
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use tracing::warn;

use crate::core::ErrorCode;
use crate::core::Evaluation;
use crate::core::EvaluationContext;
use crate::core::EvaluationOptions;
use crate::core::Flag;
use crate::core::Reason;
use crate::core::ResolutionDetails;
use crate::core::flag::json_kind;
use crate::interfaces::Clock;
use crate::interfaces::FlagCatalog;
use crate::query::AttributeView;
use crate::runtime::rule::RuleInput;
use crate::runtime::rule::RuleOutcome;
use crate::runtime::rule::evaluate_rule;
use crate::runtime::schedule::resolve_flag;

// ============================================================================
// SECTION: Typed Values
// ============================================================================

/// Rust type a flag value can be resolved into.
pub trait FlagValue: Clone {
    /// JSON type name used in type-mismatch messages.
    const TYPE_NAME: &'static str;

    /// Converts a variation value, or `None` when the JSON type differs.
    fn from_json(value: &Value) -> Option<Self>;
}

impl FlagValue for Value {
    const TYPE_NAME: &'static str = "any";

    fn from_json(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FlagValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FlagValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FlagValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FlagValue for f64 {
    const TYPE_NAME: &'static str = "number";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FlagValue for Map<String, Value> {
    const TYPE_NAME: &'static str = "object";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Evaluates flags from a catalog against contexts.
///
/// # Invariants
/// - Holds no mutable state; safe to share across threads when `C` and `K` are.
#[derive(Debug, Clone)]
pub struct FlagEvaluator<C, K> {
    /// Flag definitions.
    catalog: C,
    /// Evaluation instant source.
    clock: K,
    /// Tri-state logic for targeting queries.
    logic: LogicMode,
}

impl<C, K> FlagEvaluator<C, K>
where
    C: FlagCatalog,
    K: Clock,
{
    /// Creates an evaluator using Kleene logic.
    #[must_use]
    pub const fn new(catalog: C, clock: K) -> Self {
        Self {
            catalog,
            clock,
            logic: LogicMode::Kleene,
        }
    }

    /// Sets the tri-state logic used for targeting queries.
    #[must_use]
    pub fn with_logic(mut self, logic: LogicMode) -> Self {
        self.logic = logic;
        self
    }

    /// Returns the flag catalog.
    #[must_use]
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Evaluates a flag by name.
    ///
    /// The evaluation instant is the context's override when present,
    /// otherwise the clock.
    #[must_use]
    pub fn evaluate<T: FlagValue>(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<T>,
    ) -> Evaluation<T> {
        if !self.catalog.is_ready() {
            return failure(
                flag_name,
                None,
                options,
                ErrorCode::ProviderNotReady,
                "flag catalog is not ready".to_string(),
            );
        }
        let flag = match self.catalog.get(flag_name) {
            Ok(Some(flag)) => flag,
            Ok(None) => {
                return failure(
                    flag_name,
                    None,
                    options,
                    ErrorCode::FlagNotFound,
                    format!("flag {flag_name} not found"),
                );
            }
            Err(err) => {
                return failure(flag_name, None, options, err.error_code(), err.to_string());
            }
        };
        let now = context.evaluation_time.unwrap_or_else(|| self.clock.now());
        evaluate_flag(flag_name, &flag, context, options, now, self.logic)
    }

    /// Evaluates a boolean flag.
    #[must_use]
    pub fn evaluate_bool(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<bool>,
    ) -> Evaluation<bool> {
        self.evaluate(flag_name, context, options)
    }

    /// Evaluates a string flag.
    #[must_use]
    pub fn evaluate_string(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<String>,
    ) -> Evaluation<String> {
        self.evaluate(flag_name, context, options)
    }

    /// Evaluates an integer flag.
    #[must_use]
    pub fn evaluate_int(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<i64>,
    ) -> Evaluation<i64> {
        self.evaluate(flag_name, context, options)
    }

    /// Evaluates a floating-point flag.
    #[must_use]
    pub fn evaluate_float(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<f64>,
    ) -> Evaluation<f64> {
        self.evaluate(flag_name, context, options)
    }

    /// Evaluates an object flag.
    #[must_use]
    pub fn evaluate_object(
        &self,
        flag_name: &str,
        context: &EvaluationContext,
        options: &EvaluationOptions<Map<String, Value>>,
    ) -> Evaluation<Map<String, Value>> {
        self.evaluate(flag_name, context, options)
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates one flag definition at `now`.
///
/// The flag is never mutated; scheduled steps are applied to a private copy.
#[must_use]
pub fn evaluate_flag<T: FlagValue>(
    flag_name: &str,
    flag: &Flag,
    context: &EvaluationContext,
    options: &EvaluationOptions<T>,
    now: OffsetDateTime,
    logic: LogicMode,
) -> Evaluation<T> {
    let effective = match resolve_flag(flag, now) {
        Ok(effective) => effective,
        Err(err) => {
            return failure(flag_name, Some(flag), options, ErrorCode::General, err.to_string());
        }
    };

    let bucketing_key = match resolve_bucketing_key(&effective, context) {
        Ok(key) => key,
        Err((code, message)) => {
            return failure(flag_name, Some(&*effective), options, code, message);
        }
    };

    if effective.is_disabled() || effective.is_outside_experimentation(now) {
        let details = ResolutionDetails {
            variant: None,
            reason: Reason::Disabled,
            error_code: None,
            error_message: None,
            rule_index: None,
            rule_name: None,
            cacheable: !flag.has_time_dynamics(),
            track_events: effective.tracks_events(),
            version: effective.version.clone(),
            metadata: effective.metadata.clone(),
        };
        debug!(flag = flag_name, reason = %details.reason, "flag evaluated to caller default");
        return Evaluation {
            value: options.default_value.clone(),
            details,
        };
    }

    let view = AttributeView::new(&context.key, &context.attributes)
        .with_enrichment(&options.enrichment);
    let input = RuleInput {
        flag_name,
        bucketing_key,
        view,
        now,
        logic,
    };

    let rules = effective.rules();
    let mut winner = None;
    for (index, rule) in rules.iter().enumerate() {
        match evaluate_rule(rule, &input, false) {
            Ok(RuleOutcome::Matched(variant)) => {
                winner = Some((Some(index), rule, variant));
                break;
            }
            Ok(RuleOutcome::NotApplicable) => {}
            Err(err) => {
                return failure(flag_name, Some(&*effective), options, ErrorCode::FlagConfig, err.to_string());
            }
        }
    }

    let (rule_index, rule, variant) = match winner {
        Some(winner) => winner,
        None => {
            let Some(default_rule) = &effective.default_rule else {
                return failure(
                    flag_name,
                    Some(&*effective),
                    options,
                    ErrorCode::FlagConfig,
                    "flag has no default rule".to_string(),
                );
            };
            match evaluate_rule(default_rule, &input, true) {
                Ok(RuleOutcome::Matched(variant)) => (None, default_rule, variant),
                Ok(RuleOutcome::NotApplicable) => {
                    return failure(
                        flag_name,
                        Some(&*effective),
                        options,
                        ErrorCode::FlagConfig,
                        "default rule did not apply".to_string(),
                    );
                }
                Err(err) => {
                    return failure(
                        flag_name,
                        Some(&*effective),
                        options,
                        ErrorCode::FlagConfig,
                        err.to_string(),
                    );
                }
            }
        }
    };

    let Some(raw_value) = effective.variation(variant) else {
        return failure(
            flag_name,
            Some(&*effective),
            options,
            ErrorCode::FlagConfig,
            format!("variation {variant} is not defined"),
        );
    };
    let Some(value) = T::from_json(raw_value) else {
        return failure(
            flag_name,
            Some(&*effective),
            options,
            ErrorCode::TypeMismatch,
            format!(
                "variation {variant} is {} but {} was requested",
                json_kind(raw_value),
                T::TYPE_NAME
            ),
        );
    };

    let details = ResolutionDetails {
        variant: Some(variant.to_string()),
        reason: Reason::classify(!rules.is_empty(), rule_index.is_some(), rule.is_dynamic()),
        error_code: None,
        error_message: None,
        rule_index,
        rule_name: rule.name.clone(),
        cacheable: rule.progressive_rollout.is_none() && !flag.has_time_dynamics(),
        track_events: effective.tracks_events(),
        version: effective.version.clone(),
        metadata: effective.metadata.clone(),
    };
    debug!(
        flag = flag_name,
        variant,
        reason = %details.reason,
        cacheable = details.cacheable,
        "flag evaluated"
    );
    Evaluation {
        value,
        details,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Determines the string hashed for percentage splits and rollouts.
fn resolve_bucketing_key<'c>(
    flag: &Flag,
    context: &'c EvaluationContext,
) -> Result<&'c str, (ErrorCode, String)> {
    let Some(attribute) = flag.bucketing_key.as_deref() else {
        if context.key.is_empty() {
            return Err((ErrorCode::TargetingKeyMissing, "subject key is empty".to_string()));
        }
        return Ok(context.key.as_str());
    };
    match context.attributes.get(attribute) {
        Some(Value::String(key)) if !key.is_empty() => Ok(key.as_str()),
        Some(Value::String(_)) => Err((
            ErrorCode::TargetingKeyMissing,
            format!("bucketing attribute {attribute} is empty"),
        )),
        None | Some(Value::Null) => Err((
            ErrorCode::TargetingKeyMissing,
            format!("bucketing attribute {attribute} is missing"),
        )),
        Some(other) => Err((
            ErrorCode::InvalidContext,
            format!("bucketing attribute {attribute} must be a string, found {}", json_kind(other)),
        )),
    }
}

/// Builds an error result carrying the caller's default value.
fn failure<T: FlagValue>(
    flag_name: &str,
    flag: Option<&Flag>,
    options: &EvaluationOptions<T>,
    code: ErrorCode,
    message: String,
) -> Evaluation<T> {
    warn!(flag = flag_name, error_code = %code, error = %message, "flag evaluation failed");
    let mut details = ResolutionDetails::error(code, message);
    if let Some(flag) = flag {
        details.track_events = flag.tracks_events();
        details.version.clone_from(&flag.version);
        details.metadata.clone_from(&flag.metadata);
    }
    Evaluation {
        value: options.default_value.clone(),
        details,
    }
}
