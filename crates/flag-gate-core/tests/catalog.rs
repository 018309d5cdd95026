// crates/flag-gate-core/tests/catalog.rs
// ============================================================================
// Module: In-Memory Catalog Tests
// Description: Loading, validation, and atomic replacement of flag catalogs.
// ============================================================================

//! ## Overview
//! Validates catalog loading from JSON, rejection of invalid definitions,
//! and whole-catalog replacement.

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

mod support;

use std::collections::BTreeMap;

use flag_gate_core::CatalogError;
use flag_gate_core::ErrorCode;
use flag_gate_core::FlagCatalog;
use flag_gate_core::InMemoryFlagCatalog;
use flag_gate_core::ValidationLimits;
use serde_json::json;

use crate::support::TestResult;
use crate::support::ensure;
use crate::support::flag;
use crate::support::static_flag;

const CATALOG_JSON: &str = r##"{
    "new-checkout": {
        "variations": { "on": true, "off": false },
        "targeting": [
            { "name": "staff", "query": "email ew \"@example.com\"", "variation": "on" },
            { "name": "pro", "query": { "==": [{ "var": "plan" }, "pro"] }, "variation": "on" }
        ],
        "defaultRule": { "variation": "off" }
    },
    "banner-color": {
        "variations": { "red": "#f00", "blue": "#00f" },
        "defaultRule": { "percentage": { "red": 50, "blue": 50 } }
    }
}"##;

#[test]
fn catalog_is_not_ready_until_loaded() -> TestResult {
    let catalog = InMemoryFlagCatalog::new();
    ensure(!catalog.is_ready(), "fresh catalog must not be ready")?;
    ensure(catalog.get("anything")?.is_none(), "fresh catalog has no flags")?;

    let count = catalog.load_json_str(CATALOG_JSON)?;
    ensure(count == 2, "both flags load")?;
    ensure(catalog.is_ready(), "loaded catalog is ready")?;
    ensure(catalog.get("new-checkout")?.is_some(), "flag is present")?;
    ensure(catalog.get("missing")?.is_none(), "unknown flag is absent")?;
    Ok(())
}

#[test]
fn empty_catalog_is_ready() -> TestResult {
    let catalog = InMemoryFlagCatalog::new();
    catalog.load_json_str("{}")?;
    ensure(catalog.is_ready(), "an empty load still marks the catalog ready")
}

#[test]
fn malformed_json_is_a_parse_error() {
    let catalog = InMemoryFlagCatalog::new();
    let err = catalog.load_json_str("{ not json").expect_err("parse error");
    assert!(matches!(err, CatalogError::Parse(_)));
    assert_eq!(err.error_code(), ErrorCode::ParseError);
    assert!(!catalog.is_ready());
}

#[test]
fn invalid_query_is_a_parse_error() {
    let catalog = InMemoryFlagCatalog::new();
    let err = catalog
        .load_json_str(
            r#"{"f": {"variations": {"a": 1}, "targeting": [{"query": "plan eq", "variation": "a"}], "defaultRule": {"variation": "a"}}}"#,
        )
        .expect_err("parse error");
    assert!(matches!(err, CatalogError::Parse(_)));
}

#[test]
fn invalid_flag_keeps_previous_snapshot() {
    let catalog = InMemoryFlagCatalog::new();
    catalog.load_json_str(CATALOG_JSON).expect("initial load");

    let err = catalog
        .load_json_str(r#"{"broken": {"variations": {"a": 1}}}"#)
        .expect_err("invalid flag");
    assert!(matches!(err, CatalogError::Invalid { ref flag, .. } if flag == "broken"));
    assert_eq!(err.error_code(), ErrorCode::FlagConfig);
    assert!(catalog.get("new-checkout").expect("get").is_some());
    assert!(catalog.get("broken").expect("get").is_none());
}

#[test]
fn replace_all_swaps_the_whole_catalog() {
    let catalog = InMemoryFlagCatalog::new();
    catalog.load_json_str(CATALOG_JSON).expect("initial load");
    let previous = catalog.snapshot().expect("snapshot").expect("loaded");

    let mut flags = BTreeMap::new();
    flags.insert("only".to_string(), static_flag("A"));
    catalog.replace_all(flags).expect("replace");

    assert!(catalog.get("new-checkout").expect("get").is_none());
    assert!(catalog.get("only").expect("get").is_some());
    assert_eq!(previous.len(), 2);
}

#[test]
fn flag_limit_is_enforced() {
    let limits = ValidationLimits {
        max_flags: 1,
        ..ValidationLimits::default()
    };
    let catalog = InMemoryFlagCatalog::with_limits(limits);
    let err = catalog.load_json_str(CATALOG_JSON).expect_err("too many flags");
    assert!(matches!(
        err,
        CatalogError::TooManyFlags {
            max: 1,
            actual: 2
        }
    ));
    assert_eq!(err.error_code(), ErrorCode::General);

    catalog.insert("first", static_flag("A")).expect("insert");
    assert!(matches!(
        catalog.insert("second", static_flag("B")),
        Err(CatalogError::TooManyFlags { .. })
    ));
    catalog.insert("first", static_flag("B")).expect("replace existing");
}

#[test]
fn insert_validates_and_remove_deletes() {
    let catalog = InMemoryFlagCatalog::new();
    assert!(catalog.remove("missing").expect("remove").is_none());

    catalog.insert("static", static_flag("A")).expect("insert");
    assert!(catalog.is_ready());
    assert!(matches!(
        catalog.insert("bad", flag(json!({ "variations": { "a": 1 } }))),
        Err(CatalogError::Invalid { .. })
    ));

    let removed = catalog.remove("static").expect("remove");
    assert!(removed.is_some());
    assert!(catalog.get("static").expect("get").is_none());
    assert!(catalog.is_ready());
}

#[test]
fn clones_share_the_same_snapshot() {
    let catalog = InMemoryFlagCatalog::new();
    let handle = catalog.clone();
    catalog.insert("static", static_flag("A")).expect("insert");
    assert!(handle.get("static").expect("get").is_some());
}
