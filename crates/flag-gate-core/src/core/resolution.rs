// crates/flag-gate-core/src/core/resolution.rs
// ============================================================================
// Module: Flag Gate Resolution Records
// Description: Reasons, error codes, and the per-evaluation result record.
// Purpose: Explain every evaluation outcome with a stable, serializable taxonomy.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every evaluation produces a [`ResolutionDetails`] record, including failed
//! ones. Failures never surface as `Err`: the caller's default value is
//! returned with `Reason::Error` and an [`ErrorCode`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Reason
// ============================================================================

/// Why a particular value was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// A targeting rule matched and selected a fixed variation.
    TargetingMatch,
    /// A targeting rule matched and split subjects by percentage or rollout.
    TargetingMatchSplit,
    /// The default rule split subjects by percentage or rollout.
    Split,
    /// The default rule applied after no targeting rule matched.
    Default,
    /// The flag has no targeting rules; the default rule always applies.
    Static,
    /// The flag is disabled or outside its experimentation window.
    Disabled,
    /// Evaluation failed; the caller's default value was returned.
    Error,
    /// Reserved for hosts that cannot classify a result.
    Unknown,
}

impl Reason {
    /// Returns the wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetingMatch => "TARGETING_MATCH",
            Self::TargetingMatchSplit => "TARGETING_MATCH_SPLIT",
            Self::Split => "SPLIT",
            Self::Default => "DEFAULT",
            Self::Static => "STATIC",
            Self::Disabled => "DISABLED",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Classifies the reason for a successful rule resolution.
    ///
    /// `matched_targeting` is true when a targeting rule (not the default
    /// rule) won; `dynamic` is true when the winning rule splits subjects.
    #[must_use]
    pub const fn classify(has_targeting: bool, matched_targeting: bool, dynamic: bool) -> Self {
        match (matched_targeting, dynamic) {
            (true, true) => Self::TargetingMatchSplit,
            (true, false) => Self::TargetingMatch,
            (false, true) => Self::Split,
            (false, false) if has_targeting => Self::Default,
            (false, false) => Self::Static,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Code
// ============================================================================

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The flag catalog has not been loaded yet.
    ProviderNotReady,
    /// No flag with the requested name exists.
    FlagNotFound,
    /// A flag definition could not be parsed.
    ParseError,
    /// The resolved value does not have the requested type.
    TypeMismatch,
    /// Any other failure.
    General,
    /// The context carries data the flag cannot use.
    InvalidContext,
    /// The subject key (or bucketing attribute) is missing or empty.
    TargetingKeyMissing,
    /// The flag definition is malformed.
    FlagConfig,
}

impl ErrorCode {
    /// Returns the wire name of the error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderNotReady => "PROVIDER_NOT_READY",
            Self::FlagNotFound => "FLAG_NOT_FOUND",
            Self::ParseError => "PARSE_ERROR",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::General => "GENERAL",
            Self::InvalidContext => "INVALID_CONTEXT",
            Self::TargetingKeyMissing => "TARGETING_KEY_MISSING",
            Self::FlagConfig => "FLAG_CONFIG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Resolution Details
// ============================================================================

/// Explanation attached to every evaluation result.
///
/// # Invariants
/// - `error_code` is set if and only if `reason` is [`Reason::Error`].
/// - `variant` is `None` whenever the caller's default value was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDetails {
    /// Name of the resolved variation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Why the value was returned.
    pub reason: Reason,
    /// Failure category when `reason` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Index of the winning targeting rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    /// Name of the winning rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    /// Whether the result may be reused without re-evaluating.
    pub cacheable: bool,
    /// Whether evaluation events for this flag should be tracked.
    pub track_events: bool,
    /// Flag version copied from the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Flag metadata copied from the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ResolutionDetails {
    /// Builds an error record with no flag information attached.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            variant: None,
            reason: Reason::Error,
            error_code: Some(code),
            error_message: Some(message.into()),
            rule_index: None,
            rule_name: None,
            cacheable: false,
            track_events: true,
            version: None,
            metadata: None,
        }
    }

    /// Returns true when the record describes a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

/// A resolved value with its explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<T = Value> {
    /// Resolved value, or the caller's default on failure.
    pub value: T,
    /// Explanation of the outcome.
    pub details: ResolutionDetails,
}
