// crates/flag-gate-core/src/query/mod.rs
// ============================================================================
// Module: Flag Gate Targeting Queries
// Description: Targeting query compilation, limits, and matching.
// Purpose: Turn rule query text into a reusable compiled predicate.
// Dependencies: flag-logic, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`TargetingQuery`] keeps its source text and a compiled requirement
//! tree. Queries are compiled once when a flag is decoded and reused for
//! every evaluation. Two dialects are accepted:
//! - **Expression**: infix text such as `plan eq "pro" and age ge 18`.
//! - **Structured**: a JSON logic document such as
//!   `{"==": [{"var": "plan"}, "pro"]}`, written either as a JSON object or
//!   as a string containing one.
//!
//! Empty or whitespace-only text matches every context. A condition whose
//! attribute is missing is `Unknown`, and only a `True` outcome matches.
//! Queries built only from `true`/`false` literals are folded to their fixed
//! outcome at compile time and never walk the tree during evaluation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod attributes;
pub mod comparator;
pub mod condition;
pub mod expression;
pub mod structured;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use flag_logic::Requirement;
use flag_logic::RequirementValidator;
use flag_logic::TriLogic;
use flag_logic::TriState;
use flag_logic::ValidationConfig;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Value;
use thiserror::Error;

pub use self::attributes::AttributePath;
pub use self::attributes::AttributeView;
pub use self::comparator::Comparator;
pub use self::condition::Condition;
pub use self::condition::Operand;
use crate::core::limits::QueryLimits;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum node count of a compiled query.
const MAX_QUERY_NODES: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while compiling a targeting query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Query text exceeded the size limit.
    #[error("query exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual query length in bytes.
        actual_bytes: usize,
    },
    /// Query exceeded the nesting limit.
    #[error("query nesting exceeds limit: depth {actual_depth} (max {max_depth}) at {position}")]
    NestingTooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
        /// Depth reached.
        actual_depth: usize,
        /// Byte offset in the query text (0 for structured documents).
        position: usize,
    },
    /// Unexpected token in expression text.
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the query text.
        position: usize,
    },
    /// String literal without a closing quote.
    #[error("unterminated string starting at {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Unsupported escape sequence in a string literal.
    #[error("invalid escape `\\{found}` at {position}")]
    InvalidEscape {
        /// Escaped character.
        found: char,
        /// Byte offset of the escaped character.
        position: usize,
    },
    /// Numeric literal failed to parse.
    #[error("invalid number `{raw}` at {position}")]
    InvalidNumber {
        /// The raw numeric text.
        raw: String,
        /// Byte offset in the query text.
        position: usize,
    },
    /// Input remained after a complete expression.
    #[error("unexpected trailing input at {position}")]
    TrailingInput {
        /// Byte offset where unexpected input begins.
        position: usize,
    },
    /// Structured document used an unsupported operator.
    #[error("unknown logic operator `{0}`")]
    UnknownOperator(String),
    /// Structured operator received malformed arguments.
    #[error("operator `{operator}` {message}")]
    InvalidArguments {
        /// Operator name.
        operator: String,
        /// Description of the problem.
        message: String,
    },
    /// Structured document is not a logic object.
    #[error("invalid logic document: {0}")]
    InvalidDocument(String),
    /// Compiled tree failed structural validation.
    #[error("{0}")]
    Validation(String),
}

// ============================================================================
// SECTION: Compiled Query
// ============================================================================

/// Dialect a query was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDialect {
    /// Empty text; matches everything.
    Empty,
    /// Infix expression text.
    Expression,
    /// JSON logic document.
    Structured,
}

/// Compiled form of a targeting query.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    /// Empty query.
    MatchAll,
    /// Compiled expression-dialect query.
    Expression(Requirement<Condition>),
    /// Compiled structured-dialect query.
    Structured(Requirement<Condition>),
}

impl CompiledQuery {
    /// Returns the dialect of the compiled query.
    #[must_use]
    pub const fn dialect(&self) -> QueryDialect {
        match self {
            Self::MatchAll => QueryDialect::Empty,
            Self::Expression(_) => QueryDialect::Expression,
            Self::Structured(_) => QueryDialect::Structured,
        }
    }

    /// Returns the requirement tree, if any.
    #[must_use]
    pub const fn requirement(&self) -> Option<&Requirement<Condition>> {
        match self {
            Self::MatchAll => None,
            Self::Expression(requirement) | Self::Structured(requirement) => Some(requirement),
        }
    }
}

// ============================================================================
// SECTION: Targeting Query
// ============================================================================

/// Targeting query with its source text and compiled predicate.
///
/// # Invariants
/// - `compiled` is the compilation of `source`.
/// - `constant` is `Some` exactly when `compiled` reads no attribute.
/// - Equality and serialization use `source` only.
#[derive(Clone)]
pub struct TargetingQuery {
    /// Query text as authored.
    source: String,
    /// Compiled predicate shared across clones.
    compiled: Arc<CompiledQuery>,
    /// Fixed outcome of a query without conditions.
    constant: Option<bool>,
}

impl TargetingQuery {
    /// Compiles a query using the default limits.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the query is malformed or exceeds the limits.
    pub fn parse(source: &str) -> Result<Self, QueryError> {
        Self::parse_with_limits(source, &QueryLimits::default())
    }

    /// Compiles a query using explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the query is malformed or exceeds the limits.
    pub fn parse_with_limits(source: &str, limits: &QueryLimits) -> Result<Self, QueryError> {
        ensure_size(source, limits)?;

        let trimmed = source.trim();
        let compiled = if trimmed.is_empty() {
            CompiledQuery::MatchAll
        } else if let Ok(document @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
            CompiledQuery::Structured(structured::compile_document(&document, limits.max_depth)?)
        } else {
            CompiledQuery::Expression(expression::parse_expression(trimmed, limits.max_depth)?)
        };

        let constant = compiled.requirement().map_or(Some(true), Requirement::constant_value);
        let query = Self {
            source: source.to_string(),
            compiled: Arc::new(compiled),
            constant,
        };
        query.check_limits(limits)?;
        Ok(query)
    }

    /// Returns the query text as authored.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the query dialect.
    #[must_use]
    pub fn dialect(&self) -> QueryDialect {
        self.compiled.dialect()
    }

    /// Returns the compiled form.
    #[must_use]
    pub fn compiled(&self) -> &CompiledQuery {
        &self.compiled
    }

    /// Returns the outcome when it does not depend on the context.
    #[must_use]
    pub const fn constant_outcome(&self) -> Option<bool> {
        self.constant
    }

    /// Re-checks an already compiled query against (possibly tighter) limits.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the source or the compiled tree exceeds the limits.
    pub fn check_limits(&self, limits: &QueryLimits) -> Result<(), QueryError> {
        ensure_size(&self.source, limits)?;
        let Some(requirement) = self.compiled.requirement() else {
            return Ok(());
        };
        let validator = RequirementValidator::new(ValidationConfig {
            max_depth: limits.max_depth,
            max_nodes: MAX_QUERY_NODES,
            allow_empty_logical: true,
        });
        validator.validate(requirement).map_err(|err| QueryError::Validation(err.to_string()))
    }

    /// Evaluates the query against an attribute view.
    #[must_use]
    pub fn evaluate<L: TriLogic>(&self, view: &AttributeView<'_>, logic: &L) -> TriState {
        if let Some(outcome) = self.constant {
            return TriState::from(outcome);
        }
        self.compiled
            .requirement()
            .map_or(TriState::True, |requirement| requirement.eval_tristate(view, logic))
    }

    /// Returns true only when the query evaluates to `True`.
    #[must_use]
    pub fn matches<L: TriLogic>(&self, view: &AttributeView<'_>, logic: &L) -> bool {
        self.evaluate(view, logic).is_true()
    }
}

/// Rejects query text over the byte limit.
fn ensure_size(source: &str, limits: &QueryLimits) -> Result<(), QueryError> {
    if source.len() > limits.max_bytes {
        return Err(QueryError::InputTooLarge {
            max_bytes: limits.max_bytes,
            actual_bytes: source.len(),
        });
    }
    Ok(())
}

impl fmt::Debug for TargetingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetingQuery")
            .field("source", &self.source)
            .field("dialect", &self.dialect())
            .finish()
    }
}

impl fmt::Display for TargetingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for TargetingQuery {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl FromStr for TargetingQuery {
    type Err = QueryError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

impl Serialize for TargetingQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for TargetingQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let source = match raw {
            Value::String(source) => source,
            document @ Value::Object(_) => document.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "targeting query must be a string or logic object, found {}",
                    crate::core::flag::json_kind(&other)
                )));
            }
        };
        Self::parse_with_limits(&source, &QueryLimits::hard_max()).map_err(serde::de::Error::custom)
    }
}
