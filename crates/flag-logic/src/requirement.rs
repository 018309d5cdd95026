// crates/flag-logic/src/requirement.rs
// ============================================================================
// Module: Requirement Trees
// Description: And/Or/Not trees over opaque condition leaves.
// Purpose: Hold a compiled targeting query and fold it to a tri-state outcome.
// Dependencies: serde::{Deserialize, Serialize}, smallvec::SmallVec
// ============================================================================

//! ## Overview
//! A [`Requirement`] is what both targeting dialects compile to. Connectives
//! are fixed; leaves are any type implementing [`TriStateConditionEval`].
//!
//! Literal `true` and `false` need no leaf: an empty `And` is the identity of
//! conjunction and an empty `Or` the identity of disjunction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::traits::TriStateConditionEval;
use crate::tristate::TriLogic;
use crate::tristate::TriState;

/// Child list stored inline for the common small fan-out.
type Children<C> = SmallVec<[Box<Requirement<C>>; 4]>;

// ============================================================================
// SECTION: Requirement
// ============================================================================

/// Boolean tree whose leaves are domain conditions.
///
/// # Invariants
/// - `And([])` always yields `True` and `Or([])` always yields `False`.
#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub enum Requirement<C> {
    /// Every child must hold.
    And(Children<C>),
    /// At least one child must hold.
    Or(Children<C>),
    /// Child must not hold.
    Not(Box<Self>),
    /// Leaf condition.
    Condition(C),
}

impl<C> Requirement<C> {
    /// Builds a conjunction.
    pub fn and(children: Vec<Self>) -> Self {
        Self::And(boxed(children))
    }

    /// Builds a disjunction.
    pub fn or(children: Vec<Self>) -> Self {
        Self::Or(boxed(children))
    }

    /// Builds a negation.
    pub fn negate(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Wraps a leaf condition.
    pub const fn condition(condition: C) -> Self {
        Self::Condition(condition)
    }

    // ========================================================================
    // SECTION: Evaluation
    // ========================================================================

    /// Folds the tree against `reader` using `logic`.
    ///
    /// Every child is evaluated; connectives never short-circuit.
    pub fn eval_tristate<L>(&self, reader: &C::Reader<'_>, logic: &L) -> TriState
    where
        C: TriStateConditionEval,
        L: TriLogic,
    {
        match self {
            Self::Condition(condition) => condition.eval_tristate(reader),
            Self::Not(inner) => logic.not(inner.eval_tristate(reader, logic)),
            Self::And(children) => children
                .iter()
                .fold(TriState::True, |acc, child| logic.and(acc, child.eval_tristate(reader, logic))),
            Self::Or(children) => children
                .iter()
                .fold(TriState::False, |acc, child| logic.or(acc, child.eval_tristate(reader, logic))),
        }
    }

    /// Returns the outcome of a tree that contains no leaves.
    ///
    /// Any leaf makes the result `None`, even under a connective that would
    /// otherwise decide it (`false and x`), because the Bochvar table lets an
    /// unknown leaf override such operands.
    pub fn constant_value(&self) -> Option<bool> {
        match self {
            Self::Condition(_) => None,
            Self::Not(inner) => inner.constant_value().map(|value| !value),
            Self::And(children) => children
                .iter()
                .try_fold(true, |acc, child| child.constant_value().map(|value| acc && value)),
            Self::Or(children) => children
                .iter()
                .try_fold(false, |acc, child| child.constant_value().map(|value| acc || value)),
        }
    }
}

/// Boxes each child into an inline list.
fn boxed<C>(children: Vec<Requirement<C>>) -> Children<C> {
    children.into_iter().map(Box::new).collect()
}
