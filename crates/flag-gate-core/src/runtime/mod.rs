// crates/flag-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Flag Gate Runtime
// Description: Evaluation engine components and in-memory host adapters.
// Purpose: Export bucketing, rule evaluation, scheduling, and the evaluator.
// Dependencies: crate::{core, interfaces, query}
// ============================================================================

//! ## Overview
//! Runtime components, leaves first: the bucketing engine, rule evaluation,
//! the scheduled rollout resolver, and the evaluation orchestrator. The
//! in-memory catalog and clocks implement the host interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod bucketing;
pub mod catalog;
pub mod clock;
pub mod evaluator;
pub mod rule;
pub mod schedule;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bucketing::Bucket;
pub use bucketing::BucketingError;
pub use bucketing::evaluate_percentage;
pub use bucketing::evaluate_progressive;
pub use bucketing::percentage_buckets;
pub use catalog::FlagSnapshot;
pub use catalog::InMemoryFlagCatalog;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use evaluator::FlagEvaluator;
pub use evaluator::FlagValue;
pub use evaluator::evaluate_flag;
pub use rule::RuleError;
pub use rule::RuleInput;
pub use rule::RuleOutcome;
pub use rule::evaluate_rule;
pub use schedule::ResolveError;
pub use schedule::apply_scheduled_steps;
pub use schedule::resolve_flag;
