// crates/flag-logic/src/traits.rs
// ============================================================================
// Module: Condition Traits
// Description: Evaluation contracts for requirement leaves.
// Purpose: Let domains plug condition semantics into the requirement algebra.
// Dependencies: crate::tristate
// ============================================================================

//! ## Overview
//! A requirement tree is generic over its leaf type. Leaves implement
//! [`TriStateConditionEval`] against a domain reader (for flags, the attribute
//! view of one evaluation context).

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::tristate::TriState;

// ============================================================================
// SECTION: Tri-State Condition Trait
// ============================================================================

/// Condition evaluation that can return `Unknown` for insufficient data
pub trait TriStateConditionEval {
    /// Domain-specific reader the condition is evaluated against
    type Reader<'a>;

    /// Evaluates the condition against the reader
    ///
    /// Returns `TriState::Unknown` when the data needed to decide is missing
    /// or cannot be compared.
    fn eval_tristate(&self, reader: &Self::Reader<'_>) -> TriState;
}
