// crates/flag-gate-core/src/lib.rs
// ============================================================================
// Module: Flag Gate Core Library
// Description: Public API surface for the flag evaluation engine.
// Purpose: Expose flag types, query dialects, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, query, runtime}
// ============================================================================

//! ## Overview
//! Flag Gate core decides which variation of a feature flag a subject receives
//! and reports why. Evaluation is pure and deterministic: the outcome depends
//! only on the flag definition, the evaluation context and the evaluation
//! instant. The engine performs no I/O; flag catalogs and clocks are supplied
//! by the host through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod query;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CatalogError;
pub use interfaces::Clock;
pub use interfaces::FlagCatalog;
pub use query::AttributeView;
pub use query::CompiledQuery;
pub use query::QueryDialect;
pub use query::QueryError;
pub use query::TargetingQuery;
pub use runtime::BucketingError;
pub use runtime::FixedClock;
pub use runtime::FlagEvaluator;
pub use runtime::FlagValue;
pub use runtime::InMemoryFlagCatalog;
pub use runtime::ResolveError;
pub use runtime::RuleInput;
pub use runtime::RuleError;
pub use runtime::RuleOutcome;
pub use runtime::SystemClock;
pub use runtime::apply_scheduled_steps;
pub use runtime::evaluate_flag;
pub use runtime::evaluate_rule;
pub use runtime::resolve_flag;
