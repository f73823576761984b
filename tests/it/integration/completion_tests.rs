//! Cartesian completion workflows.

use crate::helpers::{assert_same_store, num, population_table, row, text};
use coretable::{CoreTable, MISSING, TableError, TransformCategory};
use std::collections::HashSet;

/// 5 entities x 4 years with the combinations where `(e + y) % 3 == 0`
/// left out
fn sparse_table() -> CoreTable {
    let mut csv = String::from("entity,year,value\n");
    for e in 0..5 {
        for y in 0..4 {
            if (e + y) % 3 != 0 {
                csv.push_str(&format!("E{},{},{}\n", e, 2000 + y, e * 10 + y));
            }
        }
    }
    CoreTable::new(csv, vec![]).unwrap()
}

#[test]
fn test_usa_fra_scenario() {
    let table = population_table();
    let completed = table.complete(&["country", "year"]).unwrap();

    assert_eq!(completed.num_rows(), 4);
    assert_eq!(
        completed.row_at(3),
        Some(&row(&[
            ("country", text("FRA")),
            ("pop", MISSING),
            ("year", num(2001.0)),
        ]))
    );
    assert_eq!(completed.rows()[..3], table.rows()[..]);
    assert_eq!(completed.category(), TransformCategory::AppendRows);
}

#[test]
fn test_completion_reaches_cartesian_size() {
    let table = sparse_table();
    let k = table.get("entity").unique_values().len();
    let m = table.get("year").unique_values().len();
    assert_eq!((k, m), (5, 4));
    assert!(table.num_rows() < k * m);

    let completed = table.complete(&["entity", "year"]).unwrap();
    assert_eq!(completed.num_rows(), k * m);

    let keys: HashSet<String> = completed.row_index(&["entity", "year"]).into_keys().collect();
    assert_eq!(keys.len(), k * m);
    assert_eq!(
        completed.get("value").num_error_values(),
        k * m - table.num_rows()
    );
}

#[test]
fn test_completion_is_idempotent() {
    let completed = sparse_table().complete(&["entity", "year"]).unwrap();
    let twice = completed.complete(&["entity", "year"]).unwrap();
    assert_eq!(twice.num_rows(), completed.num_rows());
    assert_same_store(&twice, &completed);
}

#[test]
fn test_rows_with_error_keys_are_kept() {
    let table = CoreTable::new("e,year\nA,2000\nB,\nB,2001\n", vec![]).unwrap();
    let completed = table.complete(&["e", "year"]).unwrap();
    // A-2001 and B-2000 are synthesized; the blank-year row stays
    assert_eq!(completed.num_rows(), 5);
    assert!(completed.get("year").values_including_error_values()[1].is_error());
}

#[test]
fn test_completion_argument_errors() {
    let table = population_table();
    assert!(matches!(
        table.complete(&["country", "year", "pop"]),
        Err(TableError::CompleteRequiresTwoColumns { got: 3 })
    ));
    assert!(matches!(
        table.complete(&[]),
        Err(TableError::CompleteRequiresTwoColumns { got: 0 })
    ));
}
