// crates/flag-gate-core/src/query/attributes.rs
// ============================================================================
// Module: Flag Gate Attribute View
// Description: Read-only attribute lookup over an evaluation context.
// Purpose: Resolve dotted attribute paths against context and enrichment data.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Queries never see the context directly; they read through an
//! [`AttributeView`]. Lookup order is:
//! 1. built-in `key` / `targetingKey`, which always resolve to the subject key;
//! 2. context attributes;
//! 3. enrichment attributes supplied with the evaluation options.
//!
//! A path such as `user.plan` first matches a literal attribute named
//! `user.plan`, then walks nested objects (and array indexes).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Built-Ins
// ============================================================================

/// Attribute names that resolve to the subject key.
const SUBJECT_KEY_ATTRIBUTES: [&str; 2] = ["key", "targetingKey"];

// ============================================================================
// SECTION: Attribute Path
// ============================================================================

/// Dotted attribute path parsed once at query compile time.
///
/// # Invariants
/// - `segments` is the `raw` path split on `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    /// Path as written in the query.
    raw: String,
    /// Path segments.
    segments: Vec<String>,
}

impl AttributePath {
    /// Parses a dotted path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Finds the value at this path inside an attribute map.
    fn find_in<'m>(&self, map: &'m Map<String, Value>) -> Option<&'m Value> {
        if let Some(value) = map.get(&self.raw) {
            return Some(value);
        }
        let (first, rest) = self.segments.split_first()?;
        let mut current = map.get(first)?;
        for segment in rest {
            current = match current {
                Value::Object(object) => object.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// SECTION: Attribute View
// ============================================================================

/// Read-only view of the attributes a query may inspect.
#[derive(Debug, Clone, Copy)]
pub struct AttributeView<'a> {
    /// Subject key of the evaluation context.
    subject_key: &'a str,
    /// Context attributes.
    attributes: &'a Map<String, Value>,
    /// Enrichment attributes; shadowed by context attributes.
    enrichment: Option<&'a Map<String, Value>>,
}

impl<'a> AttributeView<'a> {
    /// Creates a view over a subject key and its attributes.
    #[must_use]
    pub const fn new(subject_key: &'a str, attributes: &'a Map<String, Value>) -> Self {
        Self {
            subject_key,
            attributes,
            enrichment: None,
        }
    }

    /// Adds enrichment attributes consulted after the context attributes.
    #[must_use]
    pub const fn with_enrichment(mut self, enrichment: &'a Map<String, Value>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Returns the subject key.
    #[must_use]
    pub const fn subject_key(&self) -> &'a str {
        self.subject_key
    }

    /// Resolves an attribute path, or `None` when it is absent.
    #[must_use]
    pub fn lookup(&self, path: &AttributePath) -> Option<Cow<'a, Value>> {
        if SUBJECT_KEY_ATTRIBUTES.contains(&path.as_str()) {
            return Some(Cow::Owned(Value::String(self.subject_key.to_string())));
        }
        if let Some(value) = path.find_in(self.attributes) {
            return Some(Cow::Borrowed(value));
        }
        self.enrichment.and_then(|enrichment| path.find_in(enrichment)).map(Cow::Borrowed)
    }
}
