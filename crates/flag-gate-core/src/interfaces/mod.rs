// crates/flag-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Flag Gate Interfaces
// Description: Host-facing seams for flag storage and time.
// Purpose: Define the contract surfaces used by the Flag Gate evaluator.
// Dependencies: crate::core, thiserror, time
// ============================================================================

//! ## Overview
//! The engine performs no I/O. Hosts provide flag definitions through a
//! [`FlagCatalog`] and the evaluation instant through a [`Clock`].
//! Implementations must be safe to share across threads and must fail closed
//! on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::ErrorCode;
use crate::core::Flag;
use crate::core::FlagError;

// ============================================================================
// SECTION: Flag Catalog
// ============================================================================

/// Flag catalog errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Flag definitions could not be decoded.
    #[error("flag catalog parse error: {0}")]
    Parse(String),
    /// A flag definition failed structural validation.
    #[error("flag {flag} is invalid: {source}")]
    Invalid {
        /// Flag name.
        flag: String,
        /// Validation failure.
        source: FlagError,
    },
    /// The catalog would exceed its flag limit.
    #[error("flag catalog holds {actual} flags (max {max})")]
    TooManyFlags {
        /// Configured maximum.
        max: usize,
        /// Attempted count.
        actual: usize,
    },
    /// Catalog storage failed.
    #[error("flag catalog store error: {0}")]
    Store(String),
}

impl CatalogError {
    /// Returns the evaluation error code for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::ParseError,
            Self::Invalid {
                ..
            } => ErrorCode::FlagConfig,
            Self::TooManyFlags {
                ..
            }
            | Self::Store(_) => ErrorCode::General,
        }
    }
}

/// Read access to validated flag definitions.
pub trait FlagCatalog {
    /// Returns true once the catalog has been loaded.
    fn is_ready(&self) -> bool;

    /// Looks up a flag by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be read.
    fn get(&self, name: &str) -> Result<Option<Arc<Flag>>, CatalogError>;
}

impl<T: FlagCatalog + ?Sized> FlagCatalog for Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn get(&self, name: &str) -> Result<Option<Arc<Flag>>, CatalogError> {
        (**self).get(name)
    }
}

impl<T: FlagCatalog + ?Sized> FlagCatalog for &T {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn get(&self, name: &str) -> Result<Option<Arc<Flag>>, CatalogError> {
        (**self).get(name)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the evaluation instant when the context does not override it.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}
