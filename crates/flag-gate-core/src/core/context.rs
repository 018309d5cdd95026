// crates/flag-gate-core/src/core/context.rs
// ============================================================================
// Module: Flag Gate Evaluation Context
// Description: Per-request subject data and caller evaluation options.
// Purpose: Carry the subject key, custom attributes, and optional virtual clock.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! An [`EvaluationContext`] describes who is asking. The subject key may be
//! empty; whether that is an error depends on the flag's bucketing key.
//! [`EvaluationOptions`] carries what the caller falls back to and any
//! enrichment attributes supplied outside the context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Subject being evaluated.
///
/// # Invariants
/// - `evaluation_time`, when set, replaces the wall clock for this evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    /// Subject key (targeting key); may be empty.
    #[serde(default, alias = "targetingKey")]
    pub key: String,
    /// Custom attributes visible to targeting queries.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Virtual current instant used instead of the wall clock.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub evaluation_time: Option<OffsetDateTime>,
}

impl EvaluationContext {
    /// Creates a context for the given subject key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: Map::new(),
            evaluation_time: None,
        }
    }

    /// Adds a custom attribute, replacing any previous value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Pins the evaluation instant.
    #[must_use]
    pub fn at(mut self, instant: OffsetDateTime) -> Self {
        self.evaluation_time = Some(instant);
        self
    }
}

// ============================================================================
// SECTION: Evaluation Options
// ============================================================================

/// Caller-supplied fallback value and enrichment attributes.
///
/// The context's own attributes win over enrichment attributes of the same
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOptions<T = Value> {
    /// Value returned whenever the engine cannot or must not resolve a variation.
    pub default_value: T,
    /// Extra attributes visible to targeting queries.
    pub enrichment: Map<String, Value>,
}

impl<T> EvaluationOptions<T> {
    /// Creates options with the given default value and no enrichment.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            enrichment: Map::new(),
        }
    }

    /// Adds an enrichment attribute.
    #[must_use]
    pub fn with_enrichment(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.enrichment.insert(name.into(), value.into());
        self
    }
}

impl Default for EvaluationOptions<Value> {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}
