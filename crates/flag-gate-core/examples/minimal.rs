// crates/flag-gate-core/examples/minimal.rs
// ============================================================================
// Module: Flag Gate Minimal Example
// Description: Minimal end-to-end flag evaluation using in-memory adapters.
// Purpose: Demonstrate catalog loading and typed evaluation.
// Dependencies: flag-gate-core
// ============================================================================

//! ## Overview
//! Loads a small flag catalog from JSON and evaluates it for two subjects.
//! This example performs no I/O and is suitable for quick verification.

use flag_gate_core::EvaluationContext;
use flag_gate_core::EvaluationOptions;
use flag_gate_core::FlagEvaluator;
use flag_gate_core::InMemoryFlagCatalog;
use flag_gate_core::Reason;
use flag_gate_core::SystemClock;

/// Error type for example preconditions.
#[derive(Debug)]
struct ExampleError(&'static str);

impl std::fmt::Display for ExampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ExampleError {}

/// Flag definitions keyed by flag name.
const FLAGS: &str = r#"{
    "new-checkout": {
        "variations": { "on": true, "off": false },
        "targeting": [
            { "name": "pro-plan", "query": "plan eq \"pro\"", "variation": "on" }
        ],
        "defaultRule": { "name": "rollout", "percentage": { "on": 10, "off": 90 } }
    }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = InMemoryFlagCatalog::new();
    catalog.load_json_str(FLAGS)?;
    let evaluator = FlagEvaluator::new(catalog, SystemClock);
    let defaults = EvaluationOptions::new(false);

    let pro = EvaluationContext::new("user-1").with_attribute("plan", "pro");
    let result = evaluator.evaluate_bool("new-checkout", &pro, &defaults);
    if !result.value || result.details.reason != Reason::TargetingMatch {
        return Err(Box::new(ExampleError("pro users must match the targeting rule")));
    }

    let free = EvaluationContext::new("user-2").with_attribute("plan", "free");
    let result = evaluator.evaluate_bool("new-checkout", &free, &defaults);
    if result.details.is_error() || result.details.reason != Reason::Split {
        return Err(Box::new(ExampleError("free users must fall through to the split")));
    }
    Ok(())
}
