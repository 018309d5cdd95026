// crates/flag-gate-core/src/query/structured.rs
// ============================================================================
// Module: Flag Gate Structured Dialect
// Description: Compiler for JSON logic-document targeting queries.
// Purpose: Translate a supported JSON logic subset into requirement trees.
// Dependencies: flag-logic, serde_json
// ============================================================================

//! ## Overview
//! Structured queries are JSON objects in the JSON logic style:
//! `{"operator": [arguments...]}`. The supported operators are
//! `and`, `or`, `!`, `!!`, `==`, `===`, `!=`, `!==`, `<`, `<=`, `>`, `>=`,
//! `in`, `starts_with`, `ends_with`, and `var`. Loose and strict equality
//! share one comparison. Three-argument `<` and `<=` test that the middle
//! argument lies between the outer two.
//!
//! `{"var": "path"}` reads an attribute; `{"var": ["path", default]}`
//! supplies a value for an absent attribute. A bare `var` document, or any
//! non-logical argument of `and`/`or`/`!`, is a truthiness test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flag_logic::Requirement;
use serde_json::Map;
use serde_json::Value;

use crate::query::QueryError;
use crate::query::attributes::AttributePath;
use crate::query::comparator::Comparator;
use crate::query::condition::Condition;
use crate::query::condition::Operand;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Compiles a structured logic document into a requirement tree.
///
/// `max_depth` bounds nesting of logical operators.
///
/// # Errors
///
/// Returns [`QueryError`] for unknown operators, malformed arguments, or
/// excessive nesting.
pub fn compile_document(
    document: &Value,
    max_depth: usize,
) -> Result<Requirement<Condition>, QueryError> {
    Compiler {
        max_depth,
    }
    .compile(document, 0)
}

// ============================================================================
// SECTION: Compiler
// ============================================================================

/// Recursive compiler carrying the nesting limit.
struct Compiler {
    /// Maximum allowed nesting depth.
    max_depth: usize,
}

impl Compiler {
    /// Compiles a document that must evaluate to a boolean outcome.
    fn compile(&self, document: &Value, depth: usize) -> Result<Requirement<Condition>, QueryError> {
        if depth > self.max_depth {
            return Err(QueryError::NestingTooDeep {
                max_depth: self.max_depth,
                actual_depth: depth,
                position: 0,
            });
        }

        match document {
            Value::Bool(true) => Ok(Requirement::and(Vec::new())),
            Value::Bool(false) => Ok(Requirement::or(Vec::new())),
            Value::Object(object) => {
                let (operator, arguments) = single_entry(object)?;
                self.compile_operator(operator, arguments, depth)
            }
            other => Err(QueryError::InvalidDocument(format!(
                "expected a logic object or boolean, found {}",
                crate::core::flag::json_kind(other)
            ))),
        }
    }

    /// Compiles one operator application.
    fn compile_operator(
        &self,
        operator: &str,
        arguments: &Value,
        depth: usize,
    ) -> Result<Requirement<Condition>, QueryError> {
        let args = argument_list(arguments);
        match operator {
            "and" | "or" => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.compile_boolean(arg, depth + 1)?);
                }
                if operator == "and" {
                    Ok(Requirement::and(parts))
                } else {
                    Ok(Requirement::or(parts))
                }
            }
            "!" => {
                let [arg] = args.as_slice() else {
                    return Err(arity(operator, "1", args.len()));
                };
                Ok(Requirement::negate(self.compile_boolean(arg, depth + 1)?))
            }
            "!!" => {
                let [arg] = args.as_slice() else {
                    return Err(arity(operator, "1", args.len()));
                };
                Ok(Requirement::condition(Condition::unary(Comparator::Truthy, operand(arg)?)))
            }
            "var" => Ok(Requirement::condition(Condition::unary(
                Comparator::Truthy,
                var_operand(arguments)?,
            ))),
            "<" | "<=" if args.len() == 3 => {
                let comparator = comparator_for(operator)?;
                let [low, middle, high] = args.as_slice() else {
                    return Err(arity(operator, "2 or 3", args.len()));
                };
                Ok(Requirement::and(vec![
                    Requirement::condition(Condition::binary(comparator, operand(low)?, operand(middle)?)),
                    Requirement::condition(Condition::binary(
                        comparator,
                        operand(middle)?,
                        operand(high)?,
                    )),
                ]))
            }
            _ => {
                let comparator = comparator_for(operator)?;
                let [left, right] = args.as_slice() else {
                    return Err(arity(operator, "2", args.len()));
                };
                Ok(Requirement::condition(Condition::binary(comparator, operand(left)?, operand(right)?)))
            }
        }
    }

    /// Compiles a logical operand: a nested document, or a truthiness test.
    fn compile_boolean(
        &self,
        document: &Value,
        depth: usize,
    ) -> Result<Requirement<Condition>, QueryError> {
        match document {
            Value::Bool(_) => self.compile(document, depth),
            Value::Object(object) if !is_var(object) => self.compile(document, depth),
            other => Ok(Requirement::condition(Condition::unary(Comparator::Truthy, operand(other)?))),
        }
    }
}

// ============================================================================
// SECTION: Operands
// ============================================================================

/// Converts an argument into a comparison operand.
fn operand(value: &Value) -> Result<Operand, QueryError> {
    match value {
        Value::Object(object) if is_var(object) => {
            let (_, arguments) = single_entry(object)?;
            var_operand(arguments)
        }
        Value::Object(object) => {
            let name = object.keys().next().map_or("{}", String::as_str);
            Err(QueryError::InvalidArguments {
                operator: name.to_string(),
                message: "cannot be used as a comparison operand".to_string(),
            })
        }
        other => Ok(Operand::Literal(other.clone())),
    }
}

/// Builds an attribute operand from the arguments of a `var` operator.
fn var_operand(arguments: &Value) -> Result<Operand, QueryError> {
    let (path, default) = match arguments {
        Value::Array(items) => match items.as_slice() {
            [path] => (path, None),
            [path, default] => (path, Some(default.clone())),
            _ => return Err(arity("var", "1 or 2", items.len())),
        },
        path => (path, None),
    };
    let path = match path {
        Value::String(path) if !path.is_empty() => path.clone(),
        Value::Number(index) => index.to_string(),
        _ => {
            return Err(QueryError::InvalidArguments {
                operator: "var".to_string(),
                message: "expects a non-empty attribute path".to_string(),
            });
        }
    };
    Ok(Operand::Attribute {
        path: AttributePath::parse(&path),
        default,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a comparison operator name to its comparator.
fn comparator_for(operator: &str) -> Result<Comparator, QueryError> {
    match operator {
        "==" | "===" => Ok(Comparator::Equals),
        "!=" | "!==" => Ok(Comparator::NotEquals),
        "<" => Ok(Comparator::LessThan),
        "<=" => Ok(Comparator::LessThanOrEqual),
        ">" => Ok(Comparator::GreaterThan),
        ">=" => Ok(Comparator::GreaterThanOrEqual),
        "in" => Ok(Comparator::In),
        "starts_with" => Ok(Comparator::StartsWith),
        "ends_with" => Ok(Comparator::EndsWith),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

/// Returns the sole `(operator, arguments)` entry of a logic object.
fn single_entry(object: &Map<String, Value>) -> Result<(&str, &Value), QueryError> {
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((operator, arguments)), None) => Ok((operator.as_str(), arguments)),
        _ => Err(QueryError::InvalidDocument(format!(
            "logic objects must have exactly one operator, found {}",
            object.len()
        ))),
    }
}

/// Normalizes operator arguments: arrays are argument lists, anything else is one argument.
fn argument_list(arguments: &Value) -> Vec<&Value> {
    match arguments {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Returns true when the object is a `var` document.
fn is_var(object: &Map<String, Value>) -> bool {
    object.len() == 1 && object.contains_key("var")
}

/// Builds an arity error.
fn arity(operator: &str, expected: &str, actual: usize) -> QueryError {
    QueryError::InvalidArguments {
        operator: operator.to_string(),
        message: format!("expects {expected} arguments, found {actual}"),
    }
}
