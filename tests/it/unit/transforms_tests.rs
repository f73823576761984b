//! Unit tests for column transforms, applied through tables.

use crate::helpers::{gdp_table, num};
use coretable::{CellValue, ColumnDef, ColumnTransform, ColumnTypeName, CoreTable, ErrorValue, TableError};

fn with_transform(expression: &str) -> CoreTable {
    gdp_table()
        .append_columns(vec![
            ColumnDef::new("out")
                .with_type(ColumnTypeName::Numeric)
                .with_transform(expression),
        ])
        .unwrap()
}

fn err(e: ErrorValue) -> CellValue {
    CellValue::Error(e)
}

#[test]
fn test_percent_change_per_entity() {
    let table = with_transform("percentChange year entityName gdp 1");
    assert_eq!(
        table.get("out").values_including_error_values(),
        &[
            err(ErrorValue::NoValueToCompareAgainst),
            num(10.0),
            num(10.0),
            err(ErrorValue::NoValueToCompareAgainst),
            err(ErrorValue::NotAParseableNumberButShouldBeNumber),
        ]
    );
}

#[test]
fn test_rolling_average_window() {
    let table = with_transform("rollingAverage year entityName gdp 2");
    assert_eq!(
        table.get("out").values_including_error_values(),
        &[
            num(100.0),
            num(105.0),
            num(115.5),
            num(200.0),
            err(ErrorValue::NotAParseableNumberButShouldBeNumber),
        ]
    );
}

#[test]
fn test_time_since_threshold() {
    let table = with_transform("timeSinceEntityExceededThreshold year entityName gdp 105");
    assert_eq!(
        table.get("out").values_including_error_values(),
        &[
            err(ErrorValue::ValueTooLow),
            num(0.0),
            num(1.0),
            num(0.0),
            num(1.0),
        ]
    );
}

#[test]
fn test_as_percentage_of_and_missing_source() {
    let table = with_transform("asPercentageOf gdp pop");
    assert_eq!(table.get("out").values_including_error_values()[0], num(1000.0));

    let table = with_transform("multiplyBy nope 2");
    assert!(table.get("out").values_including_error_values().iter().all(|v| *v == coretable::MISSING));
}

#[test]
fn test_invalid_expressions_fail_fast() {
    assert!("multiplyBy gdp ten".parse::<ColumnTransform>().is_err());
    assert!("divideBy gdp".parse::<ColumnTransform>().is_err());

    let result = gdp_table().append_columns(vec![ColumnDef::new("out").with_transform("explode gdp")]);
    match result {
        Err(TableError::InvalidTransform { slug, expression, .. }) => {
            assert_eq!(slug, "out");
            assert_eq!(expression, "explode gdp");
        }
        other => panic!("expected InvalidTransform, got {:?}", other.map(|t| t.num_rows())),
    }
}

#[test]
fn test_transform_cycle_is_rejected() {
    let result = CoreTable::new(
        "a\n1\n",
        vec![
            ColumnDef::new("b").with_transform("duplicate c"),
            ColumnDef::new("c").with_transform("duplicate b"),
        ],
    );
    assert!(matches!(result, Err(TableError::TransformCycle { .. })));
}
