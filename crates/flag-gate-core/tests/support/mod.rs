// crates/flag-gate-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared fixtures for flag-gate-core integration tests.
// ============================================================================
//! ## Overview
//! Builders for flags, contexts, and instants, plus Result-based assertion
//! helpers. Flags are written as JSON so fixtures read like real definitions.

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

use std::error::Error;
use std::fmt;

use flag_gate_core::EvaluationContext;
use flag_gate_core::EvaluationOptions;
use flag_gate_core::Flag;
use flag_gate_core::ValidationLimits;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across flag-gate-core integration tests.
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

// ========================================================================
// Fixtures
// ========================================================================

/// Parses an RFC 3339 instant.
pub fn instant(text: &str) -> OffsetDateTime {
    OffsetDateTime::parse(text, &Rfc3339).expect("valid RFC 3339 instant")
}

/// Decodes a flag from JSON.
pub fn flag(value: Value) -> Flag {
    serde_json::from_value(value).expect("flag decodes")
}

/// Decodes a flag from JSON and validates it with default limits.
pub fn valid_flag(value: Value) -> Flag {
    let flag = flag(value);
    flag.validate(&ValidationLimits::default()).expect("flag is valid");
    flag
}

/// Flag with a single fixed default rule and no targeting.
pub fn static_flag(variation: &str) -> Flag {
    valid_flag(json!({
        "variations": { "A": "value-a", "B": "value-b" },
        "defaultRule": { "variation": variation }
    }))
}

/// Boolean flag serving `enabled` to beta users and `disabled` otherwise.
pub fn beta_flag() -> Flag {
    valid_flag(json!({
        "variations": { "enabled": true, "disabled": false },
        "targeting": [
            { "name": "beta", "query": "beta eq true", "variation": "enabled" }
        ],
        "defaultRule": { "name": "fallback", "variation": "disabled" }
    }))
}

/// Context for a subject key.
pub fn context(key: &str) -> EvaluationContext {
    EvaluationContext::new(key)
}

/// Options with a JSON default value.
pub fn options(default_value: Value) -> EvaluationOptions {
    EvaluationOptions::new(default_value)
}

/// Subject keys `user-0` .. `user-{count}`.
pub fn subject_keys(count: usize) -> impl Iterator<Item = String> {
    (0 .. count).map(|index| format!("user-{index}"))
}
