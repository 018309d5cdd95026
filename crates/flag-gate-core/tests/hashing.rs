// crates/flag-gate-core/tests/hashing.rs
// ============================================================================
// Module: Hashing Tests
// Description: Subject bucketing hashes and flag fingerprints.
// ============================================================================
//! ## Overview
//! Subject hashes are pinned to known values so a change to the hash input
//! (which would reshuffle every subject) fails loudly. Fingerprints must be
//! independent of key order.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use flag_gate_core::Flag;
use flag_gate_core::HashAlgorithm;
use flag_gate_core::core::hashing::canonical_json_bytes;
use flag_gate_core::core::hashing::hash_bytes;
use flag_gate_core::core::hashing::hash_canonical_json;
use flag_gate_core::subject_hash;
use serde_json::json;

#[test]
fn subject_hash_matches_known_values() {
    assert_eq!(subject_hash("my-flag", "user-123"), 2_527_508_842);
    assert_eq!(subject_hash("split-flag", "alice"), 1_298_278_020);
    assert_eq!(subject_hash("", "a"), 0xe40c_292c);
    assert_eq!(subject_hash("", ""), 0x811c_9dc5);
}

#[test]
fn subject_hash_concatenates_name_and_key() {
    assert_eq!(subject_hash("flag", "key"), 481_132_110);
    assert_eq!(subject_hash("fla", "gkey"), subject_hash("flag", "key"));
}

#[test]
fn subject_hash_depends_on_flag_name() {
    assert_ne!(subject_hash("flag-a", "alice"), subject_hash("flag-b", "alice"));
}

#[test]
fn canonical_bytes_sort_keys() {
    let bytes = canonical_json_bytes(&json!({"b": 2, "a": 1})).expect("canonical bytes");
    assert_eq!(bytes, br#"{"a":1,"b":2}"#.to_vec());
    assert_eq!(
        hash_bytes(HashAlgorithm::Sha256, &bytes).value,
        "43258cff783fe7036d8a43033f830adfc60ec037382473548ac742b888292777"
    );
}

#[test]
fn flag_fingerprint_ignores_field_order() {
    let first: Flag = serde_json::from_value(json!({
        "variations": { "on": true, "off": false },
        "defaultRule": { "variation": "off" },
        "version": "1"
    }))
    .expect("flag");
    let second: Flag = serde_json::from_str(
        r#"{"version":"1","defaultRule":{"variation":"off"},"variations":{"off":false,"on":true}}"#,
    )
    .expect("flag");
    assert_eq!(first.fingerprint().expect("fingerprint"), second.fingerprint().expect("fingerprint"));
}

#[test]
fn flag_fingerprint_changes_with_content() {
    let base: Flag = serde_json::from_value(json!({
        "variations": { "on": true, "off": false },
        "defaultRule": { "variation": "off" }
    }))
    .expect("flag");
    let mut changed = base.clone();
    changed.disable = Some(true);
    assert_ne!(
        hash_canonical_json(HashAlgorithm::Sha256, &base).expect("hash"),
        hash_canonical_json(HashAlgorithm::Sha256, &changed).expect("hash")
    );
}
