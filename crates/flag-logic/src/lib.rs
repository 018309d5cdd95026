// crates/flag-logic/src/lib.rs
// ============================================================================
// Module: Flag Logic Root
// Description: Public API surface for the tri-state requirement algebra.
// Purpose: Wire together requirement, logic table, trait, and validator modules.
// Dependencies: crate::{requirement, traits, tristate, validate}
// ============================================================================

//! ## Overview
//! `flag-logic` is the boolean core underneath targeting queries. A query is
//! compiled into a [`Requirement`] tree whose leaves are domain conditions;
//! the tree is evaluated with tri-state semantics so that a missing attribute
//! produces `Unknown` instead of silently matching or failing.
//!
//! The crate knows nothing about flags or contexts. Leaf semantics are
//! injected through [`TriStateConditionEval`].

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod requirement;
pub mod traits;
pub mod tristate;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use requirement::Requirement;
pub use traits::TriStateConditionEval;
pub use tristate::BochvarLogic;
pub use tristate::KleeneLogic;
pub use tristate::LogicMode;
pub use tristate::TriLogic;
pub use tristate::TriState;
pub use validate::RequirementValidator;
pub use validate::ValidationConfig;
pub use validate::ValidationError;
