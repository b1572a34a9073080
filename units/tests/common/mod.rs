//! Shared fixtures for integration tests
//!
//! Only one registry per process may be loaded from definition files, so
//! every test in a binary shares this one.

#![allow(dead_code)]

use std::sync::OnceLock;

use sounio_units::{Config, UnitRegistry, Value};

pub fn registry() -> &'static UnitRegistry {
    static REGISTRY: OnceLock<UnitRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        UnitRegistry::new(Config::default()).expect("bundled definitions load")
    })
}

/// Evaluate `source` against the shared registry
pub fn eval(source: &str) -> Value {
    registry()
        .evaluate(source)
        .unwrap_or_else(|e| panic!("{source}: {e}"))
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}
