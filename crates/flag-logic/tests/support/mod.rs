// crates/flag-logic/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared fixtures and result helpers for flag-logic tests.
// ============================================================================
//! ## Overview
//! A map-backed reader, a string condition leaf that looks values up in it,
//! and Result-based assertion helpers.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use flag_logic::TriState;
use flag_logic::TriStateConditionEval;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across flag-logic integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Assertion failure carrying a message.
#[derive(Debug)]
struct AssertionFailed(String);

impl fmt::Display for AssertionFailed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl Error for AssertionFailed {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns an assertion error when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition { Ok(()) } else { Err(Box::new(AssertionFailed(message.into()))) }
}

/// Returns an error when two values differ.
///
/// # Errors
/// Returns an assertion error describing both values.
pub fn ensure_eq<T: PartialEq + fmt::Debug>(actual: &T, expected: &T, what: &str) -> TestResult {
    ensure(actual == expected, format!("{what}: expected {expected:?}, got {actual:?}"))
}

// ========================================================================
// Fixture Reader
// ========================================================================

/// Named tri-state values keyed by condition name.
#[derive(Debug, Default)]
pub struct Facts {
    /// Known values; absent names evaluate to `Unknown`.
    values: BTreeMap<&'static str, bool>,
}

impl Facts {
    /// Builds a fact set from name/value pairs.
    pub fn from_pairs(pairs: &[(&'static str, bool)]) -> Self {
        Self {
            values: pairs.iter().copied().collect(),
        }
    }
}

/// Leaf condition naming a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fact(pub &'static str);

impl TriStateConditionEval for Fact {
    type Reader<'a> = Facts;

    fn eval_tristate(&self, reader: &Self::Reader<'_>) -> TriState {
        reader.values.get(self.0).copied().map_or(TriState::Unknown, TriState::from)
    }
}
