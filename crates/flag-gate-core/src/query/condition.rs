// crates/flag-gate-core/src/query/condition.rs
// ============================================================================
// Module: Flag Gate Query Conditions
// Description: Leaf conditions of compiled targeting queries.
// Purpose: Bridge attribute lookups and comparators into flag-logic evaluation.
// Dependencies: flag-logic, serde_json
// ============================================================================

//! ## Overview
//! Both query dialects compile to a `Requirement<Condition>` tree. A
//! [`Condition`] resolves its operands through an [`AttributeView`] and hands
//! them to the comparator, so the boolean algebra and its tri-state semantics
//! stay in `flag-logic`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use flag_logic::TriState;
use flag_logic::TriStateConditionEval;
use serde_json::Value;

use crate::query::attributes::AttributePath;
use crate::query::attributes::AttributeView;
use crate::query::comparator::Comparator;
use crate::query::comparator::evaluate_comparator;

// ============================================================================
// SECTION: Operand
// ============================================================================

/// Value source for one side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Attribute looked up at evaluation time.
    Attribute {
        /// Attribute path.
        path: AttributePath,
        /// Value used when the attribute is absent.
        default: Option<Value>,
    },
    /// Literal value from the query text.
    Literal(Value),
}

impl Operand {
    /// Creates an attribute operand without a default.
    #[must_use]
    pub fn attribute(path: &str) -> Self {
        Self::Attribute {
            path: AttributePath::parse(path),
            default: None,
        }
    }

    /// Resolves the operand, or `None` when an attribute is absent.
    fn resolve<'s>(&'s self, view: &AttributeView<'s>) -> Option<Cow<'s, Value>> {
        match self {
            Self::Attribute {
                path,
                default,
            } => view.lookup(path).or_else(|| default.as_ref().map(Cow::Borrowed)),
            Self::Literal(value) => Some(Cow::Borrowed(value)),
        }
    }
}

// ============================================================================
// SECTION: Condition
// ============================================================================

/// Comparator applied to one or two operands.
///
/// # Invariants
/// - `right` is `None` exactly when the comparator is unary.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Comparison to apply.
    pub comparator: Comparator,
    /// Left operand.
    pub left: Operand,
    /// Right operand for binary comparators.
    pub right: Option<Operand>,
}

impl Condition {
    /// Creates a binary condition.
    #[must_use]
    pub const fn binary(comparator: Comparator, left: Operand, right: Operand) -> Self {
        Self {
            comparator,
            left,
            right: Some(right),
        }
    }

    /// Creates a unary condition.
    #[must_use]
    pub const fn unary(comparator: Comparator, operand: Operand) -> Self {
        Self {
            comparator,
            left: operand,
            right: None,
        }
    }
}

impl TriStateConditionEval for Condition {
    type Reader<'a> = AttributeView<'a>;

    fn eval_tristate(&self, reader: &Self::Reader<'_>) -> TriState {
        let left = self.left.resolve(reader);
        let right = self.right.as_ref().and_then(|operand| operand.resolve(reader));
        evaluate_comparator(self.comparator, left.as_deref(), right.as_deref())
    }
}
