// crates/flag-logic/src/validate.rs
// ============================================================================
// Module: Requirement Validation
// Description: Structural limits for requirement trees.
// Purpose: Reject oversized or malformed trees before they are served.
// Dependencies: std::fmt
// ============================================================================

//! ## Overview
//! Trees compiled from untrusted query text are checked once, at load time,
//! for depth, node count and (optionally) empty groups. The walk uses an
//! explicit stack and stops at the first violation, so a hostile tree costs
//! at most `max_nodes` steps and no recursion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::requirement::Requirement;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// First structural limit a tree violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A node is deeper than the limit; the root is depth 0.
    TooDeep {
        /// Configured limit.
        max_depth: usize,
        /// Depth of the offending node.
        actual_depth: usize,
    },
    /// The walk visited more nodes than allowed.
    TooComplex {
        /// Configured limit.
        max_nodes: usize,
        /// Nodes visited when the walk stopped.
        actual_nodes: usize,
    },
    /// An `And` or `Or` with no children.
    EmptyLogical(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooDeep {
                max_depth,
                actual_depth,
            } => write!(f, "requirement tree too deep: {actual_depth} levels (max {max_depth})"),
            Self::TooComplex {
                max_nodes,
                actual_nodes,
            } => write!(f, "requirement tree too complex: {actual_nodes} nodes (max {max_nodes})"),
            Self::EmptyLogical(kind) => write!(f, "empty {kind} requirement not allowed"),
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Limits enforced by [`RequirementValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Deepest allowed node.
    pub max_depth: usize,
    /// Largest allowed node count.
    pub max_nodes: usize,
    /// Accept `And([])` and `Or([])` (the literal `true`/`false` forms).
    pub allow_empty_logical: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_nodes: 1024,
            allow_empty_logical: true,
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Checks requirement trees against a [`ValidationConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementValidator {
    /// Active limits.
    config: ValidationConfig,
}

impl RequirementValidator {
    /// Creates a validator with explicit limits.
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self {
            config,
        }
    }

    /// Walks `requirement` depth-first and reports the first violation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a limit is exceeded.
    pub fn validate<C>(&self, requirement: &Requirement<C>) -> Result<(), ValidationError> {
        let limits = &self.config;
        let mut pending = vec![(requirement, 0usize)];
        let mut visited = 0usize;

        while let Some((node, depth)) = pending.pop() {
            visited += 1;
            if visited > limits.max_nodes {
                return Err(ValidationError::TooComplex {
                    max_nodes: limits.max_nodes,
                    actual_nodes: visited,
                });
            }
            if depth > limits.max_depth {
                return Err(ValidationError::TooDeep {
                    max_depth: limits.max_depth,
                    actual_depth: depth,
                });
            }
            match node {
                Requirement::Condition(_) => {}
                Requirement::Not(inner) => pending.push((&**inner, depth + 1)),
                Requirement::And(children) | Requirement::Or(children) => {
                    if children.is_empty() && !limits.allow_empty_logical {
                        let kind = if matches!(node, Requirement::And(_)) { "And" } else { "Or" };
                        return Err(ValidationError::EmptyLogical(kind));
                    }
                    pending.extend(children.iter().rev().map(|child| (&**child, depth + 1)));
                }
            }
        }
        Ok(())
    }
}
