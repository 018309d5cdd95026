// crates/flag-gate-core/src/core/limits.rs
// ============================================================================
// Module: Flag Gate Validation Limits
// Description: Load-time bounds for flags, rules, and targeting queries.
// Purpose: Keep evaluation work bounded by rejecting oversized definitions.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Evaluation has no timeouts, so every bound lives here and is enforced once
//! when a flag is loaded. Hosts typically build these from configuration.

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default maximum targeting query size in bytes.
pub const DEFAULT_MAX_QUERY_BYTES: usize = 16 * 1024;
/// Default maximum targeting query nesting depth.
pub const DEFAULT_MAX_QUERY_DEPTH: usize = 32;
/// Default maximum variations per flag.
pub const DEFAULT_MAX_VARIATIONS: usize = 256;
/// Default maximum targeting rules per flag.
pub const DEFAULT_MAX_RULES: usize = 256;
/// Default maximum scheduled steps per flag.
pub const DEFAULT_MAX_SCHEDULED_STEPS: usize = 128;
/// Default maximum flags per catalog.
pub const DEFAULT_MAX_FLAGS: usize = 10_000;

/// Hard ceiling on targeting query size; configuration cannot exceed it.
pub const HARD_MAX_QUERY_BYTES: usize = 1024 * 1024;
/// Hard ceiling on targeting query depth; configuration cannot exceed it.
pub const HARD_MAX_QUERY_DEPTH: usize = 64;

// ============================================================================
// SECTION: Query Limits
// ============================================================================

/// Bounds applied when compiling targeting queries.
///
/// # Invariants
/// - Both limits are expected to be non-zero; zero rejects every non-empty query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum query source size in bytes.
    pub max_bytes: usize,
    /// Maximum nesting depth of the compiled requirement tree.
    pub max_depth: usize,
}

impl QueryLimits {
    /// Returns the hard ceilings, used when decoding queries before the
    /// configured limits are known.
    #[must_use]
    pub const fn hard_max() -> Self {
        Self {
            max_bytes: HARD_MAX_QUERY_BYTES,
            max_depth: HARD_MAX_QUERY_DEPTH,
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_QUERY_BYTES,
            max_depth: DEFAULT_MAX_QUERY_DEPTH,
        }
    }
}

// ============================================================================
// SECTION: Flag Limits
// ============================================================================

/// Bounds applied when validating flags and catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Targeting query bounds.
    pub query: QueryLimits,
    /// Maximum variations per flag.
    pub max_variations: usize,
    /// Maximum targeting rules per flag (default rule excluded).
    pub max_rules: usize,
    /// Maximum scheduled steps per flag.
    pub max_scheduled_steps: usize,
    /// Maximum flags held by one catalog.
    pub max_flags: usize,
    /// Require every percentage split to total exactly 100.
    pub require_full_percentage: bool,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            query: QueryLimits::default(),
            max_variations: DEFAULT_MAX_VARIATIONS,
            max_rules: DEFAULT_MAX_RULES,
            max_scheduled_steps: DEFAULT_MAX_SCHEDULED_STEPS,
            max_flags: DEFAULT_MAX_FLAGS,
            require_full_percentage: false,
        }
    }
}
