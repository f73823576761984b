//! Input shape detection and JSON-described tables.

use crate::helpers::{num, text};
use coretable::{
    CellValue, ColumnDef, ColumnTypeName, CoreTable, ErrorValue, InputType, TableError, TableInput,
};
use serde_json::json;

#[test]
fn test_json_shapes_are_detected() {
    let cases = [
        (json!("a,b\n1,2\n"), InputType::Delimited),
        (json!([{"a": 1, "b": 2}]), InputType::RowStore),
        (json!([["a", "b"], [1, 2]]), InputType::Matrix),
        (json!({"a": [1], "b": [2]}), InputType::ColumnStore),
    ];
    for (value, expected) in cases {
        let table = CoreTable::new(TableInput::from_json(value).unwrap(), vec![]).unwrap();
        assert_eq!(table.input_type(), expected);
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.get("a").numeric_values(), vec![1.0]);
        assert_eq!(table.get("b").numeric_values(), vec![2.0]);
    }
}

#[test]
fn test_bad_json_input() {
    assert!(matches!(
        TableInput::from_json(json!(42)),
        Err(TableError::InvalidInput(_))
    ));
    assert!(matches!(
        TableInput::from_json(json!([{"a": 1}, [1]])),
        Err(TableError::InvalidInput(_))
    ));
    assert!(matches!(
        TableInput::from_json(json!({"a": [1, 2], "b": [1]})),
        Err(TableError::ColumnLengthMismatch { .. })
    ));
}

#[test]
fn test_column_defs_from_json() {
    let defs: Vec<ColumnDef> = serde_json::from_value(json!([
        {"slug": "share", "type": "Percentage", "shortName": "%", "display": {"numDecimalPlaces": 1}},
        {"slug": "flag", "type": "Boolean"}
    ]))
    .unwrap();
    assert_eq!(defs[0].type_name(), ColumnTypeName::Percentage);
    assert_eq!(defs[0].short_name.as_deref(), Some("%"));

    let table = CoreTable::new("share,flag\n12.34,yes\n50,maybe\n", defs).unwrap();
    assert_eq!(
        table.get("share").formatted_values(),
        vec!["12.3%".to_string(), "50%".to_string()]
    );
    assert_eq!(
        table.get("flag").values_including_error_values(),
        &[
            CellValue::Boolean(true),
            CellValue::Error(ErrorValue::InvalidBooleanValue)
        ]
    );
}

#[test]
fn test_matrix_input_is_trimmed_and_padded() {
    let matrix = vec![
        vec![text("name"), text("value"), CellValue::Null],
        vec![text("x"), num(1.0), CellValue::Null],
        vec![text("y")],
        vec![CellValue::Null, CellValue::Null, CellValue::Null],
    ];
    let table = CoreTable::new(matrix, vec![]).unwrap();
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.column_slugs(), vec!["name", "value"]);
    assert_eq!(
        table.get("value").values_including_error_values()[1],
        CellValue::Error(ErrorValue::BlankOrUndefinedButShouldBeNumber)
    );
}

#[test]
fn test_column_store_length_mismatch() {
    let store = coretable::ColumnStore::from_columns([
        ("a", vec![num(1.0), num(2.0)]),
        ("b", vec![num(1.0)]),
    ]);
    assert!(matches!(
        store,
        Err(TableError::ColumnLengthMismatch { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn test_rows_missing_a_key_in_the_first_row_are_still_parsed() {
    let input = TableInput::from_json(json!([
        {"country": "USA"},
        {"country": "FRA", "pop": "5"},
        {"country": "DEU", "pop": "oops"}
    ]))
    .unwrap();
    let table = CoreTable::new(
        input,
        vec![ColumnDef::new("pop").with_type(ColumnTypeName::Numeric)],
    )
    .unwrap();

    let pop = table.get("pop");
    assert_eq!(
        pop.values_including_error_values(),
        &[
            CellValue::Error(ErrorValue::MissingValuePlaceholder),
            num(5.0),
            CellValue::Error(ErrorValue::NotAParseableNumberButShouldBeNumber),
        ]
    );
    assert_eq!(pop.numeric_values(), vec![5.0]);
    assert_eq!(table.to_csv(), "pop,country\n,USA\n5,FRA\n,DEU");
}
