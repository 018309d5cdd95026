// crates/flag-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `flag-gate.toml`. Every value shown is the default, so
//! the example doubles as a reference for the built-in limits.

/// Returns a canonical example `flag-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[query]
max_query_bytes = 16384
max_depth = 32
logic = "kleene"

[flags]
max_variations = 256
max_rules = 256
max_scheduled_steps = 128
require_full_percentage = false

[catalog]
max_flags = 10000
"#,
    )
}
