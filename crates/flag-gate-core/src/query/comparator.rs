// crates/flag-gate-core/src/query/comparator.rs
// ============================================================================
// Module: Flag Gate Comparator Logic
// Description: Comparator evaluation for targeting query conditions.
// Purpose: Convert attribute values into tri-state condition outcomes.
// Dependencies: bigdecimal, flag-logic, serde_json, time
// ============================================================================

//! ## Overview
//! Comparator evaluation turns a pair of resolved operands into a tri-state
//! outcome. A missing operand or an incomparable pair yields `Unknown`, which
//! never matches. Numbers compare as exact decimals; strings order as RFC 3339
//! instants when both sides parse as one, otherwise lexicographically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use flag_logic::TriState;
use serde_json::Number;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// Comparison applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Equality (numbers compare by value).
    Equals,
    /// Inequality.
    NotEquals,
    /// Strictly less than.
    LessThan,
    /// Less than or equal.
    LessThanOrEqual,
    /// Strictly greater than.
    GreaterThan,
    /// Greater than or equal.
    GreaterThanOrEqual,
    /// Substring or array membership of the right operand in the left.
    Contains,
    /// String prefix.
    StartsWith,
    /// String suffix.
    EndsWith,
    /// Membership of the left operand in the right list (or substring).
    In,
    /// Left operand is present and not null (unary).
    Present,
    /// Left operand is truthy (unary).
    Truthy,
}

impl Comparator {
    /// Returns true when the comparator takes only a left operand.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::Present | Self::Truthy)
    }

    /// Returns the operator spelling used in diagnostics.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Contains => "co",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::In => "in",
            Self::Present => "pr",
            Self::Truthy => "!!",
        }
    }
}

// ============================================================================
// SECTION: Comparator Evaluation
// ============================================================================

/// Evaluates a comparator against resolved operands.
///
/// `None` means the operand's attribute is absent from the context.
#[must_use]
pub fn evaluate_comparator(
    comparator: Comparator,
    left: Option<&Value>,
    right: Option<&Value>,
) -> TriState {
    match comparator {
        Comparator::Present => TriState::from(left.is_some_and(|value| !value.is_null())),
        Comparator::Truthy => left.map_or(TriState::Unknown, |value| TriState::from(truthy(value))),
        _ => {
            let (Some(left), Some(right)) = (left, right) else {
                return TriState::Unknown;
            };
            evaluate_binary(comparator, left, right)
        }
    }
}

/// Evaluates binary comparators against present operands.
fn evaluate_binary(comparator: Comparator, left: &Value, right: &Value) -> TriState {
    match comparator {
        Comparator::Equals => compare_equals(left, right),
        Comparator::NotEquals => compare_equals(left, right).negate(),
        Comparator::LessThan
        | Comparator::LessThanOrEqual
        | Comparator::GreaterThan
        | Comparator::GreaterThanOrEqual => compare_ordering(comparator, left, right),
        Comparator::Contains => compare_contains(left, right),
        Comparator::StartsWith => compare_strings(left, right, |haystack, needle| {
            haystack.starts_with(needle)
        }),
        Comparator::EndsWith => compare_strings(left, right, |haystack, needle| {
            haystack.ends_with(needle)
        }),
        Comparator::In => compare_in(left, right),
        Comparator::Present | Comparator::Truthy => TriState::Unknown,
    }
}

/// Compares JSON values for equality, with decimal-aware numeric handling.
fn compare_equals(left: &Value, right: &Value) -> TriState {
    match (left, right) {
        (Value::Number(left_num), Value::Number(right_num)) => {
            decimal_cmp(left_num, right_num)
                .map_or(TriState::Unknown, |ordering| TriState::from(ordering.is_eq()))
        }
        _ => TriState::from(left == right),
    }
}

/// Compares numeric or string JSON values using ordering comparators.
fn compare_ordering(comparator: Comparator, left: &Value, right: &Value) -> TriState {
    let ordering = match (left, right) {
        (Value::Number(left_num), Value::Number(right_num)) => decimal_cmp(left_num, right_num),
        (Value::String(left), Value::String(right)) => {
            Some(temporal_cmp(left, right).unwrap_or_else(|| left.cmp(right)))
        }
        _ => None,
    };
    let Some(ordering) = ordering else {
        return TriState::Unknown;
    };

    let result = match comparator {
        Comparator::GreaterThan => ordering.is_gt(),
        Comparator::GreaterThanOrEqual => ordering.is_ge(),
        Comparator::LessThan => ordering.is_lt(),
        Comparator::LessThanOrEqual => ordering.is_le(),
        _ => return TriState::Unknown,
    };
    TriState::from(result)
}

/// Evaluates containment of `right` inside `left`.
fn compare_contains(left: &Value, right: &Value) -> TriState {
    match (left, right) {
        (Value::String(haystack), Value::String(needle)) => {
            TriState::from(haystack.contains(needle.as_str()))
        }
        (Value::Array(haystack), Value::Array(needles)) => TriState::from(
            needles.iter().all(|needle| haystack.iter().any(|item| values_equal(item, needle))),
        ),
        (Value::Array(haystack), needle) => {
            TriState::from(haystack.iter().any(|item| values_equal(item, needle)))
        }
        _ => TriState::Unknown,
    }
}

/// Evaluates membership of `left` in the list (or string) `right`.
fn compare_in(left: &Value, right: &Value) -> TriState {
    match (left, right) {
        (Value::Array(_) | Value::Object(_), _) => TriState::Unknown,
        (_, Value::Array(values)) => {
            TriState::from(values.iter().any(|item| values_equal(item, left)))
        }
        (Value::String(needle), Value::String(haystack)) => {
            TriState::from(haystack.contains(needle.as_str()))
        }
        _ => TriState::Unknown,
    }
}

/// Applies a string predicate when both values are strings.
fn compare_strings(left: &Value, right: &Value, predicate: impl Fn(&str, &str) -> bool) -> TriState {
    match (left, right) {
        (Value::String(left), Value::String(right)) => TriState::from(predicate(left, right)),
        _ => TriState::Unknown,
    }
}

// ============================================================================
// SECTION: Value Helpers
// ============================================================================

/// Returns true when two values are equal, comparing numbers by value.
fn values_equal(left: &Value, right: &Value) -> bool {
    compare_equals(left, right).is_true()
}

/// Returns the truthiness of a JSON value.
///
/// `null`, `false`, zero, empty strings, and empty arrays are falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => {
            decimal_from_number(number).is_some_and(|decimal| decimal != BigDecimal::from(0))
        }
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Orders numeric JSON values using decimal-aware comparison.
fn decimal_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    let left = decimal_from_number(left)?;
    let right = decimal_from_number(right)?;
    Some(left.cmp(&right))
}

/// Parses a JSON number into `BigDecimal` with a stable string representation.
fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Compares two strings as RFC 3339 instants when both parse as one.
fn temporal_cmp(left: &str, right: &str) -> Option<Ordering> {
    let left = OffsetDateTime::parse(left, &Rfc3339).ok()?;
    let right = OffsetDateTime::parse(right, &Rfc3339).ok()?;
    Some(left.cmp(&right))
}

// ============================================================================
// SECTION: Tri-State Helpers
// ============================================================================

/// Negation that keeps `Unknown` unknown.
trait Negate {
    /// Returns the logical negation.
    fn negate(self) -> Self;
}

impl Negate for TriState {
    fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}
