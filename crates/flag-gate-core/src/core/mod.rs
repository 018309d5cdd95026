// crates/flag-gate-core/src/core/mod.rs
// ============================================================================
// Module: Flag Gate Core Types
// Description: Canonical flag definitions, contexts, and resolution records.
// Purpose: Provide stable, serializable types for flag evaluation.
// Dependencies: flag-logic, serde, time
// ============================================================================

//! ## Overview
//! Core types define flags, rules, evaluation contexts, and the resolution
//! records returned to callers. They are the canonical source of truth for
//! any host surface built on top of the engine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod context;
pub mod flag;
pub mod hashing;
pub mod limits;
pub mod resolution;
pub mod rule;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::EvaluationContext;
pub use context::EvaluationOptions;
pub use flag::ExperimentationRollout;
pub use flag::Flag;
pub use flag::FlagError;
pub use flag::ScheduledStep;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::subject_hash;
pub use limits::DEFAULT_MAX_FLAGS;
pub use limits::DEFAULT_MAX_QUERY_BYTES;
pub use limits::DEFAULT_MAX_QUERY_DEPTH;
pub use limits::DEFAULT_MAX_RULES;
pub use limits::DEFAULT_MAX_SCHEDULED_STEPS;
pub use limits::DEFAULT_MAX_VARIATIONS;
pub use limits::HARD_MAX_QUERY_BYTES;
pub use limits::HARD_MAX_QUERY_DEPTH;
pub use limits::QueryLimits;
pub use limits::ValidationLimits;
pub use resolution::ErrorCode;
pub use resolution::Evaluation;
pub use resolution::Reason;
pub use resolution::ResolutionDetails;
pub use rule::ProgressiveRollout;
pub use rule::ProgressiveRolloutStep;
pub use rule::Rule;
