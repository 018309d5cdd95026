// crates/flag-gate-core/src/query/expression.rs
// ============================================================================
// Module: Flag Gate Expression Dialect
// Description: Lexer and recursive-descent parser for textual targeting queries.
// Purpose: Compile expression-dialect queries into requirement trees.
// Dependencies: flag-logic, serde_json
// ============================================================================

//! ## Overview
//! The expression dialect is a compact infix language for targeting rules.
//! Query text is untrusted: size is checked by the caller and nesting is
//! bounded while parsing.
//!
//! ### Grammar (informal)
//! - **Comparisons**: `attr eq "x"`, `attr == "x"`, `ne`/`!=`, `lt`/`<`,
//!   `le`/`<=`, `gt`/`>`, `ge`/`>=`
//! - **String operators**: `co` (contains), `sw` (starts with), `ew` (ends with)
//! - **Membership**: `attr in ["a", "b"]`
//! - **Presence**: `attr pr`
//! - **Boolean operators**: `and`/`&&`, `or`/`||`, `not`/`!`, parentheses
//! - **Literals**: double- or single-quoted strings, numbers, `true`, `false`,
//!   `null`, and `[ ... ]` lists
//!
//! Word operators and keywords are case-insensitive. A bare attribute is a
//! truthiness test; bare `true` and `false` are constant outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flag_logic::Requirement;
use serde_json::Number;
use serde_json::Value;

use crate::query::QueryError;
use crate::query::comparator::Comparator;
use crate::query::condition::Condition;
use crate::query::condition::Operand;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Parses an expression-dialect query into a requirement tree.
///
/// `max_depth` bounds parenthesis and negation nesting.
///
/// # Errors
///
/// Returns [`QueryError`] for lexical or syntax errors and excessive nesting.
pub fn parse_expression(input: &str, max_depth: usize) -> Result<Requirement<Condition>, QueryError> {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.lex()?;

    let mut parser = Parser::new(tokens, max_depth);
    let requirement = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(requirement)
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from the query text.
#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// Attribute path.
    Ident(&'a str),
    /// Unescaped string literal.
    Str(String),
    /// Numeric literal.
    Number(Number),
    /// `true`.
    True,
    /// `false`.
    False,
    /// `null`.
    Null,
    /// Binary comparison operator.
    Compare(Comparator),
    /// `in`.
    In,
    /// `pr`.
    Present,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Logical NOT.
    Not,
    /// `(`.
    LParen,
    /// `)`.
    RParen,
    /// `[`.
    LBracket,
    /// `]`.
    RBracket,
    /// `,`.
    Comma,
    /// End-of-input marker.
    Eof,
}

/// Token paired with its byte offset.
#[derive(Debug, Clone)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for the expression dialect.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens ending with [`Token::Eof`].
    fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, QueryError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while let Some(&ch) = bytes.get(self.offset) {
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                }
                b'(' => tokens.push(self.single(Token::LParen)),
                b')' => tokens.push(self.single(Token::RParen)),
                b'[' => tokens.push(self.single(Token::LBracket)),
                b']' => tokens.push(self.single(Token::RBracket)),
                b',' => tokens.push(self.single(Token::Comma)),
                b'!' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Compare(Comparator::NotEquals)));
                    } else {
                        tokens.push(self.single(Token::Not));
                    }
                }
                b'=' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Compare(Comparator::Equals)));
                    } else {
                        return Err(self.unexpected("==", "="));
                    }
                }
                b'<' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Compare(Comparator::LessThanOrEqual)));
                    } else {
                        tokens.push(self.single(Token::Compare(Comparator::LessThan)));
                    }
                }
                b'>' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Compare(Comparator::GreaterThanOrEqual)));
                    } else {
                        tokens.push(self.single(Token::Compare(Comparator::GreaterThan)));
                    }
                }
                b'&' => {
                    if self.peek_char(bytes) == Some(b'&') {
                        tokens.push(self.double(Token::And));
                    } else {
                        return Err(self.unexpected("&&", "&"));
                    }
                }
                b'|' => {
                    if self.peek_char(bytes) == Some(b'|') {
                        tokens.push(self.double(Token::Or));
                    } else {
                        return Err(self.unexpected("||", "|"));
                    }
                }
                b'"' | b'\'' => tokens.push(self.lex_string(ch)?),
                b'-' | b'0' ..= b'9' => tokens.push(self.lex_number(bytes)?),
                b'a' ..= b'z' | b'A' ..= b'Z' | b'_' | b'$' => {
                    let start = self.offset;
                    self.consume_while(bytes, |b| {
                        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.' | b'-')
                    });
                    let slice = &self.input[start .. self.offset];
                    tokens.push(SpannedToken {
                        token: keyword_or_ident(slice),
                        position: start,
                    });
                }
                _ => {
                    let found = self.input[self.offset ..].chars().next().unwrap_or('?');
                    return Err(self.unexpected("attribute, literal, or operator", &found.to_string()));
                }
            }
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Emits a one-byte token and advances past it.
    fn single(&mut self, token: Token<'a>) -> SpannedToken<'a> {
        let position = self.offset;
        self.offset += 1;
        SpannedToken {
            token,
            position,
        }
    }

    /// Emits a two-byte token and advances past it.
    fn double(&mut self, token: Token<'a>) -> SpannedToken<'a> {
        let position = self.offset;
        self.offset += 2;
        SpannedToken {
            token,
            position,
        }
    }

    /// Builds an unexpected-token error at the current offset.
    fn unexpected(&self, expected: &'static str, found: &str) -> QueryError {
        QueryError::UnexpectedToken {
            expected,
            found: found.to_string(),
            position: self.offset,
        }
    }

    /// Returns the next byte without advancing.
    fn peek_char(&self, bytes: &[u8]) -> Option<u8> {
        bytes.get(self.offset + 1).copied()
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    /// Lexes a quoted string literal, resolving escapes.
    fn lex_string(&mut self, quote: u8) -> Result<SpannedToken<'a>, QueryError> {
        let start = self.offset;
        let body = &self.input[start + 1 ..];
        let mut value = String::new();
        let mut chars = body.char_indices();

        while let Some((index, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let Some((escape_index, escaped)) = chars.next() else {
                        break;
                    };
                    let resolved = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' | '"' | '\'' | '/' => escaped,
                        other => {
                            return Err(QueryError::InvalidEscape {
                                found: other,
                                position: start + 1 + escape_index,
                            });
                        }
                    };
                    value.push(resolved);
                }
                _ if ch == char::from(quote) => {
                    self.offset = start + 1 + index + 1;
                    return Ok(SpannedToken {
                        token: Token::Str(value),
                        position: start,
                    });
                }
                _ => value.push(ch),
            }
        }

        Err(QueryError::UnterminatedString {
            position: start,
        })
    }

    /// Lexes a numeric literal with an optional sign, fraction, and exponent.
    fn lex_number(&mut self, bytes: &[u8]) -> Result<SpannedToken<'a>, QueryError> {
        let start = self.offset;
        if bytes.get(self.offset) == Some(&b'-') {
            self.offset += 1;
        }
        let mut previous = 0u8;
        while let Some(&b) = bytes.get(self.offset) {
            let exponent_sign = matches!(b, b'+' | b'-') && matches!(previous, b'e' | b'E');
            if b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E') || exponent_sign {
                previous = b;
                self.offset += 1;
            } else {
                break;
            }
        }

        let raw = &self.input[start .. self.offset];
        let number = serde_json::from_str::<Number>(raw).map_err(|_| QueryError::InvalidNumber {
            raw: raw.to_string(),
            position: start,
        })?;
        Ok(SpannedToken {
            token: Token::Number(number),
            position: start,
        })
    }
}

/// Maps a word to a keyword token or an attribute identifier.
fn keyword_or_ident(slice: &str) -> Token<'_> {
    match slice.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        "eq" => Token::Compare(Comparator::Equals),
        "ne" => Token::Compare(Comparator::NotEquals),
        "lt" => Token::Compare(Comparator::LessThan),
        "le" => Token::Compare(Comparator::LessThanOrEqual),
        "gt" => Token::Compare(Comparator::GreaterThan),
        "ge" => Token::Compare(Comparator::GreaterThanOrEqual),
        "co" => Token::Compare(Comparator::Contains),
        "sw" => Token::Compare(Comparator::StartsWith),
        "ew" => Token::Compare(Comparator::EndsWith),
        "in" => Token::In,
        "pr" => Token::Present,
        _ => Token::Ident(slice),
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser for the expression dialect.
struct Parser<'input> {
    /// Token stream with source positions; always ends with [`Token::Eof`].
    tokens: Vec<SpannedToken<'input>>,
    /// Current token index.
    index: usize,
    /// Current nesting depth for parentheses and negations.
    nesting: usize,
    /// Maximum allowed nesting depth.
    max_depth: usize,
}

impl<'input> Parser<'input> {
    /// Creates a parser over the token stream.
    const fn new(tokens: Vec<SpannedToken<'input>>, max_depth: usize) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
            max_depth,
        }
    }

    /// Parses OR expressions.
    fn parse_or(&mut self) -> Result<Requirement<Condition>, QueryError> {
        let mut parts = vec![self.parse_and()?];
        while self.matches(&Token::Or) {
            parts.push(self.parse_and()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Requirement::or(parts)) }
    }

    /// Parses AND expressions.
    fn parse_and(&mut self) -> Result<Requirement<Condition>, QueryError> {
        let mut parts = vec![self.parse_unary()?];
        while self.matches(&Token::And) {
            parts.push(self.parse_unary()?);
        }
        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Requirement::and(parts)) }
    }

    /// Parses unary expressions, including NOT.
    fn parse_unary(&mut self) -> Result<Requirement<Condition>, QueryError> {
        let position = self.position();
        if self.matches(&Token::Not) {
            return self.with_nesting(position, |parser| {
                parser.parse_unary().map(Requirement::negate)
            });
        }
        self.parse_primary()
    }

    /// Parses a parenthesized expression or a comparison.
    fn parse_primary(&mut self) -> Result<Requirement<Condition>, QueryError> {
        let position = self.position();
        if self.matches(&Token::LParen) {
            return self.with_nesting(position, |parser| {
                let expr = parser.parse_or()?;
                parser.expect(&Token::RParen, "`)`")?;
                Ok(expr)
            });
        }
        self.parse_comparison()
    }

    /// Parses `operand op operand`, `operand in list`, `operand pr`, or a bare operand.
    fn parse_comparison(&mut self) -> Result<Requirement<Condition>, QueryError> {
        let left = self.parse_operand()?;

        match self.current().token {
            Token::Compare(comparator) => {
                self.advance();
                let right = self.parse_operand()?;
                Ok(Requirement::condition(Condition::binary(comparator, left, right)))
            }
            Token::In => {
                self.advance();
                let right = self.parse_operand()?;
                Ok(Requirement::condition(Condition::binary(Comparator::In, left, right)))
            }
            Token::Present => {
                self.advance();
                Ok(Requirement::condition(Condition::unary(Comparator::Present, left)))
            }
            _ => match left {
                Operand::Attribute {
                    ..
                } => Ok(Requirement::condition(Condition::unary(Comparator::Truthy, left))),
                Operand::Literal(Value::Bool(true)) => Ok(Requirement::and(Vec::new())),
                Operand::Literal(Value::Bool(false)) => Ok(Requirement::or(Vec::new())),
                Operand::Literal(_) => Err(self.unexpected("comparison operator")),
            },
        }
    }

    /// Parses an attribute, scalar literal, or list literal.
    fn parse_operand(&mut self) -> Result<Operand, QueryError> {
        if let Token::Ident(name) = self.current().token {
            self.advance();
            return Ok(Operand::attribute(name));
        }
        if self.matches(&Token::LBracket) {
            return self.parse_list().map(|items| Operand::Literal(Value::Array(items)));
        }
        self.parse_scalar().map(Operand::Literal)
    }

    /// Parses a scalar literal.
    fn parse_scalar(&mut self) -> Result<Value, QueryError> {
        let value = match &self.current().token {
            Token::Str(text) => Value::String(text.clone()),
            Token::Number(number) => Value::Number(number.clone()),
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::Null => Value::Null,
            _ => return Err(self.unexpected("attribute or literal")),
        };
        self.advance();
        Ok(value)
    }

    /// Parses the remainder of a list literal after `[`.
    fn parse_list(&mut self) -> Result<Vec<Value>, QueryError> {
        let mut items = Vec::new();
        if self.matches(&Token::RBracket) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_scalar()?);
            if self.matches(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBracket, "`,` or `]`")?;
            break;
        }
        Ok(items)
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let next_depth = self.nesting + 1;
        if next_depth > self.max_depth {
            return Err(QueryError::NestingTooDeep {
                max_depth: self.max_depth,
                actual_depth: next_depth,
                position,
            });
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: &Token<'_>, expected: &'static str) -> Result<(), QueryError> {
        if self.matches(token) { Ok(()) } else { Err(self.unexpected(expected)) }
    }

    /// Ensures the parser is at end-of-input.
    fn expect_eof(&self) -> Result<(), QueryError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(QueryError::TrailingInput {
                position: self.position(),
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: &Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'input> {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    /// Returns the byte offset of the current token.
    fn position(&self) -> usize {
        self.current().position
    }

    /// Advances to the next token, stopping at end-of-input.
    const fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    /// Builds an unexpected-token error for the current token.
    fn unexpected(&self, expected: &'static str) -> QueryError {
        QueryError::UnexpectedToken {
            expected,
            found: self.describe_current(),
            position: self.position(),
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        match &self.current().token {
            Token::Ident(name) => (*name).to_string(),
            Token::Str(text) => format!("\"{text}\""),
            Token::Number(number) => number.to_string(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Null => "null".to_string(),
            Token::Compare(comparator) => comparator.symbol().to_string(),
            Token::In => "in".to_string(),
            Token::Present => "pr".to_string(),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Not => "!".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::Comma => ",".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
