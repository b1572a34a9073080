//! Registries configured from files on disk

use std::fs;

use sounio_units::{Config, UnitError, UnitRegistry};

const DEFINITIONS: &str = "\
[base]
m = ScalarUnit(1, 'L', 'm'), True
s = ScalarUnit(1, 'T', 's'), True

[derived]
knot = 1852*m/(3600*s), False
";

#[test]
fn test_registry_from_discovered_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("nautical.ini"), DEFINITIONS).unwrap();
    fs::write(
        dir.path().join("units.toml"),
        "definitions = [\"nautical.ini\"]\nsimplification_level = 1\n",
    )
    .unwrap();
    let nested = dir.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();

    let config = Config::find_config(&nested).expect("config above the start directory");
    assert_eq!(config.definitions, vec![dir.path().join("nautical.ini")]);
    assert_eq!(config.simplification_level, 1);

    let registry = UnitRegistry::new(config).unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.load_report().sources, vec!["nautical.ini"]);

    let knot = registry.lookup("knot").unwrap();
    assert!((knot.value().unwrap() - 0.514444).abs() < 1e-6);
    assert!(matches!(registry.lookup("ft"), Err(UnitError::UnknownUnit(_))));
}

#[test]
fn test_missing_definition_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        definitions: vec![dir.path().join("missing.ini")],
        ..Config::default()
    };
    assert!(matches!(UnitRegistry::new(config), Err(UnitError::Io { .. })));
}
