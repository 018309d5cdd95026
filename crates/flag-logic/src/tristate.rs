// crates/flag-logic/src/tristate.rs
// ============================================================================
// Module: Tri-State Logic
// Description: Truth values with an explicit unknown and the tables that fold them.
// Purpose: Let targeting queries treat missing or incomparable data as unknown.
// Dependencies: serde::{Deserialize, Serialize}
// ============================================================================

//! ## Overview
//! A targeting query over incomplete context data cannot always answer yes or
//! no. [`TriState`] adds `Unknown` for that case and a [`TriLogic`] table
//! decides how unknowns combine.
//!
//! Strong Kleene treats truth values as ordered `False < Unknown < True`, so
//! `and` is the minimum and `or` the maximum. Bochvar is the "internal" table:
//! any unknown operand makes the whole connective unknown. Both tables negate
//! the same way, and in both a query only matches on `True`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Truth Values
// ============================================================================

/// Outcome of a condition or requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriState {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition could not be decided.
    Unknown,
}

impl TriState {
    /// Returns true only for [`TriState::True`].
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Position in the Kleene truth order.
    const fn rank(self) -> u8 {
        match self {
            Self::False => 0,
            Self::Unknown => 1,
            Self::True => 2,
        }
    }

    /// Collapses to a boolean, or `None` when unknown.
    #[must_use]
    pub const fn decided(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }
}

// ============================================================================
// SECTION: Logic Tables
// ============================================================================

/// Connective table used when folding a requirement tree.
pub trait TriLogic {
    /// Conjunction.
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Disjunction.
    fn or(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Negation. Unknown stays unknown in every supported table.
    fn not(&self, value: TriState) -> TriState {
        TriState::from(value.decided().map(|decided| !decided))
    }
}

/// Strong Kleene table.
#[derive(Debug, Clone, Copy, Default)]
pub struct KleeneLogic;

impl TriLogic for KleeneLogic {
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState {
        if lhs.rank() <= rhs.rank() { lhs } else { rhs }
    }

    fn or(&self, lhs: TriState, rhs: TriState) -> TriState {
        if lhs.rank() >= rhs.rank() { lhs } else { rhs }
    }
}

/// Bochvar table; unknown is infectious.
#[derive(Debug, Clone, Copy, Default)]
pub struct BochvarLogic;

impl TriLogic for BochvarLogic {
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs.decided(), rhs.decided()) {
            (Some(left), Some(right)) => TriState::from(left && right),
            _ => TriState::Unknown,
        }
    }

    fn or(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs.decided(), rhs.decided()) {
            (Some(left), Some(right)) => TriState::from(left || right),
            _ => TriState::Unknown,
        }
    }
}

/// Logic table selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicMode {
    /// [`KleeneLogic`].
    #[default]
    Kleene,
    /// [`BochvarLogic`].
    Bochvar,
}

impl TriLogic for LogicMode {
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic.and(lhs, rhs),
            Self::Bochvar => BochvarLogic.and(lhs, rhs),
        }
    }

    fn or(&self, lhs: TriState, rhs: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic.or(lhs, rhs),
            Self::Bochvar => BochvarLogic.or(lhs, rhs),
        }
    }
}
