//! Unit tests for loading `EngineConfig` from disk.

use coretable::{CoreTable, EngineConfig, TableError, TableOptions};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_fills_missing_fields_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("coretable.json");
    fs::write(&path, r#"{"dump_row_limit": 1, "provenance": false}"#).unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.dump_row_limit, 1);
    assert!(!config.provenance);
    assert_eq!(config.autotype_sample_size, 100);
    assert_eq!(config.slow_operation_ms, 50.0);
    assert_eq!(config.default_num_decimal_places, 2);
}

#[test]
fn test_malformed_file_is_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").unwrap();
    assert!(matches!(EngineConfig::load(&path), Err(TableError::Json(_))));
}

#[test]
fn test_loaded_config_is_inherited_by_derived_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("coretable.json");
    fs::write(&path, r#"{"dump_row_limit": 1}"#).unwrap();
    let config = EngineConfig::load(&path).unwrap();

    let table =
        CoreTable::with_options("a\n1\n2\n", vec![], TableOptions::new().with_config(config))
            .unwrap();
    assert_eq!(table.dump(None), "a\n1\n... 1 more rows");

    let child = table.reverse();
    assert_eq!(child.config().dump_row_limit, 1);
    assert_eq!(child.dump(None), "a\n2\n... 1 more rows");
}

#[test]
fn test_sample_size_limits_autotyping() {
    let config = EngineConfig {
        autotype_sample_size: 1,
        ..Default::default()
    };
    let table =
        CoreTable::with_options("v\n1\nx\n", vec![], TableOptions::new().with_config(config))
            .unwrap();
    assert_eq!(table.get("v").num_error_values(), 1);

    let table = CoreTable::new("v\n1\nx\n", vec![]).unwrap();
    assert_eq!(table.get("v").num_error_values(), 0);
}
