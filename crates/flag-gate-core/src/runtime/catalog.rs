// crates/flag-gate-core/src/runtime/catalog.rs
// ============================================================================
// Module: Flag Gate In-Memory Catalog
// Description: Validated, atomically replaceable in-memory flag catalog.
// Purpose: Provide a FlagCatalog for hosts and tests without external deps.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! The catalog holds an immutable snapshot of validated flags behind a
//! read-write lock. Writers build a complete new snapshot and swap it in, so
//! readers either see the old catalog or the new one and never hold the lock
//! while evaluating. A catalog that has never been loaded is not ready.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use tracing::debug;
use tracing::info;

use crate::core::Flag;
use crate::core::ValidationLimits;
use crate::interfaces::CatalogError;
use crate::interfaces::FlagCatalog;

// ============================================================================
// SECTION: In-Memory Catalog
// ============================================================================

/// Immutable catalog snapshot keyed by flag name.
pub type FlagSnapshot = BTreeMap<String, Arc<Flag>>;

/// In-memory flag catalog.
///
/// # Invariants
/// - Every stored flag passed [`Flag::validate`] with `limits`.
/// - The snapshot holds at most `limits.max_flags` flags.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlagCatalog {
    /// Current snapshot; `None` until the first load.
    snapshot: Arc<RwLock<Option<Arc<FlagSnapshot>>>>,
    /// Validation limits applied to every write.
    limits: ValidationLimits,
}

impl InMemoryFlagCatalog {
    /// Creates an empty, not-ready catalog with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty, not-ready catalog with explicit limits.
    #[must_use]
    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self {
            snapshot: Arc::default(),
            limits,
        }
    }

    /// Returns the validation limits.
    #[must_use]
    pub const fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validates and atomically replaces every flag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when a flag is invalid or the limit is
    /// exceeded; the previous snapshot stays in place.
    pub fn replace_all(&self, flags: BTreeMap<String, Flag>) -> Result<(), CatalogError> {
        if flags.len() > self.limits.max_flags {
            return Err(CatalogError::TooManyFlags {
                max: self.limits.max_flags,
                actual: flags.len(),
            });
        }
        let mut next = FlagSnapshot::new();
        for (name, flag) in flags {
            self.validate(&name, &flag)?;
            next.insert(name, Arc::new(flag));
        }
        let count = next.len();
        self.swap(next)?;
        info!(flags = count, "flag catalog replaced");
        Ok(())
    }

    /// Decodes a JSON object of flag name to definition and replaces the catalog.
    ///
    /// Returns the number of flags loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON (including invalid
    /// targeting queries) and [`CatalogError`] for validation failures.
    pub fn load_json_str(&self, json: &str) -> Result<usize, CatalogError> {
        let flags: BTreeMap<String, Flag> =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        let count = flags.len();
        self.replace_all(flags)?;
        Ok(count)
    }

    /// Validates and inserts (or replaces) one flag.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the flag is invalid or the limit is exceeded.
    pub fn insert(&self, name: impl Into<String>, flag: Flag) -> Result<(), CatalogError> {
        let name = name.into();
        self.validate(&name, &flag)?;
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CatalogError::Store("flag catalog lock poisoned".to_string()))?;
        let mut next = guard.as_deref().cloned().unwrap_or_default();
        next.insert(name, Arc::new(flag));
        if next.len() > self.limits.max_flags {
            return Err(CatalogError::TooManyFlags {
                max: self.limits.max_flags,
                actual: next.len(),
            });
        }
        *guard = Some(Arc::new(next));
        drop(guard);
        Ok(())
    }

    /// Removes a flag, returning its definition when it existed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] when the lock is poisoned.
    pub fn remove(&self, name: &str) -> Result<Option<Arc<Flag>>, CatalogError> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CatalogError::Store("flag catalog lock poisoned".to_string()))?;
        let Some(current) = guard.as_deref() else {
            return Ok(None);
        };
        if !current.contains_key(name) {
            return Ok(None);
        }
        let mut next = current.clone();
        let removed = next.remove(name);
        *guard = Some(Arc::new(next));
        drop(guard);
        Ok(removed)
    }

    /// Returns the current snapshot, or `None` before the first load.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] when the lock is poisoned.
    pub fn snapshot(&self) -> Result<Option<Arc<FlagSnapshot>>, CatalogError> {
        let guard = self
            .snapshot
            .read()
            .map_err(|_| CatalogError::Store("flag catalog lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    /// Validates one flag and logs its fingerprint.
    fn validate(&self, name: &str, flag: &Flag) -> Result<(), CatalogError> {
        flag.validate(&self.limits).map_err(|source| CatalogError::Invalid {
            flag: name.to_string(),
            source,
        })?;
        match flag.fingerprint() {
            Ok(digest) => debug!(flag = name, fingerprint = %digest.value, "flag validated"),
            Err(err) => debug!(flag = name, error = %err, "flag validated without fingerprint"),
        }
        Ok(())
    }

    /// Swaps in a new snapshot.
    fn swap(&self, next: FlagSnapshot) -> Result<(), CatalogError> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CatalogError::Store("flag catalog lock poisoned".to_string()))?;
        *guard = Some(Arc::new(next));
        drop(guard);
        Ok(())
    }
}

impl FlagCatalog for InMemoryFlagCatalog {
    fn is_ready(&self) -> bool {
        self.snapshot.read().is_ok_and(|guard| guard.is_some())
    }

    fn get(&self, name: &str) -> Result<Option<Arc<Flag>>, CatalogError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.and_then(|flags| flags.get(name).cloned()))
    }
}
