// crates/flag-gate-config/src/lib.rs
// ============================================================================
// Module: Flag Gate Config Library
// Description: Canonical config model and validation for the flag engine.
// Purpose: Single source of truth for flag-gate.toml semantics.
// Dependencies: flag-gate-core, flag-logic, serde, toml
// ============================================================================

//! ## Overview
//! `flag-gate-config` defines the configuration model for the flag evaluation
//! engine. Loading is strict and fail-closed: oversized, non-UTF-8, malformed,
//! or out-of-range configuration is rejected before any limit reaches the
//! engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
