// crates/flag-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Flag Gate Hashing
// Description: Subject bucketing hashes and canonical flag fingerprints.
// Purpose: Give every subject a stable bucket and every definition a stable digest.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! [`subject_hash`] is the input to every percentage split and progressive
//! rollout. It is part of the wire contract: changing it would reshuffle
//! every subject across variations on redeploy. It is 32-bit FNV-1a, not a
//! cryptographic digest.
//!
//! Fingerprints identify a flag definition independent of JSON key order by
//! hashing its RFC 8785 (JCS) canonical form. The catalog logs them on load
//! and tests use them to prove a definition was left untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Subject Hashing
// ============================================================================

/// FNV-1a 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Maps a subject onto a 32-bit bucketing value for one flag.
///
/// Computes FNV-1a over the UTF-8 bytes of `flag_name` immediately followed
/// by `subject_key` (no separator).
#[must_use]
pub fn subject_hash(flag_name: &str, subject_key: &str) -> u32 {
    fnv1a(fnv1a(FNV_OFFSET_BASIS, flag_name.as_bytes()), subject_key.as_bytes())
}

/// Folds `bytes` into a running FNV-1a state.
fn fnv1a(state: u32, bytes: &[u8]) -> u32 {
    bytes.iter().fold(state, |acc, &byte| (acc ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}

// ============================================================================
// SECTION: Fingerprints
// ============================================================================

/// Digest algorithms available for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// Algorithm used by [`crate::core::Flag::fingerprint`].
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Hex digest tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Producing algorithm.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex.
    pub value: String,
}

impl HashDigest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let value = bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        });
        Self {
            algorithm,
            value,
        }
    }
}

impl std::fmt::Display for HashDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Fingerprinting failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be rendered as canonical JSON.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

/// Renders `value` as RFC 8785 canonical JSON.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Digests raw bytes.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    let raw = match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(bytes),
    };
    HashDigest::new(algorithm, &raw)
}

/// Digests the canonical JSON form of `value`.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    canonical_json_bytes(value).map(|bytes| hash_bytes(algorithm, &bytes))
}
