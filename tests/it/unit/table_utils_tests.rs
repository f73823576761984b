//! Unit tests for the pure table utilities.

use crate::helpers::{num, population_rows, row, text};
use coretable::table_utils::{
    column_store_to_rows, concat_column_stores, parse_delimited, rows_to_column_store,
    sort_column_store, standardize_slug,
};
use coretable::{ColumnStore, ColumnTypeName, MISSING, SortOrder};
use std::sync::Arc;

#[test]
fn test_rows_round_trip_through_column_store() {
    let rows = population_rows();
    let store = rows_to_column_store(&rows);
    assert_eq!(store.num_rows(), 3);
    assert_eq!(column_store_to_rows(&store), rows);
}

#[test]
fn test_ragged_rows_get_placeholders() {
    let rows = vec![row(&[("a", num(1.0))]), row(&[("b", text("x"))])];
    let back = column_store_to_rows(&rows_to_column_store(&rows));
    assert_eq!(back[0]["b"], MISSING);
    assert_eq!(back[1]["a"], MISSING);
}

#[test]
fn test_concat_fills_gaps() {
    let left = ColumnStore::from_columns([("a", vec![num(1.0)]), ("b", vec![num(2.0)])]).unwrap();
    let right = ColumnStore::from_columns([("b", vec![num(3.0)]), ("c", vec![num(4.0)])]).unwrap();
    let joined = concat_column_stores(&[&left, &right]);
    assert_eq!(joined.slugs(), &["a", "b", "c"]);
    assert_eq!(joined.get("a").unwrap(), &[num(1.0), MISSING]);
    assert_eq!(joined.get("b").unwrap(), &[num(2.0), num(3.0)]);
    assert_eq!(joined.get("c").unwrap(), &[MISSING, num(4.0)]);
}

#[test]
fn test_sort_is_stable() {
    let store = Arc::new(
        ColumnStore::from_columns([
            ("k", vec![num(2.0), num(1.0), num(2.0), num(1.0)]),
            ("id", vec![text("a"), text("b"), text("c"), text("d")]),
        ])
        .unwrap(),
    );
    let sorted = sort_column_store(&store, &["k".to_string()], &[]);
    assert_eq!(
        sorted.get("id").unwrap(),
        &[text("b"), text("d"), text("a"), text("c")]
    );

    let desc = sort_column_store(&store, &["k".to_string()], &[SortOrder::Desc]);
    assert_eq!(
        desc.get("id").unwrap(),
        &[text("a"), text("c"), text("b"), text("d")]
    );

    let again = sort_column_store(&sorted, &["k".to_string()], &[]);
    assert!(Arc::ptr_eq(&again, &sorted));
}

#[test]
fn test_parse_delimited_guesses_and_renames() {
    let parsed = parse_delimited("Country Name;GDP\nFrance;1,5\nItaly;2\n", None, 100);
    assert_eq!(parsed.delimiter, ';');
    assert_eq!(
        parsed.guessed_types,
        vec![
            ("Country Name".to_string(), ColumnTypeName::String),
            ("GDP".to_string(), ColumnTypeName::String),
        ]
    );
    assert_eq!(parsed.renames.len(), 2);
    assert_eq!(parsed.renames[0].slug, "country_name");
    assert_eq!(parsed.renames[0].name.as_deref(), Some("Country Name"));
    assert_eq!(parsed.store.get("GDP").unwrap(), &[text("1,5"), text("2")]);
}

#[test]
fn test_standardize_slug() {
    assert_eq!(standardize_slug("Country Name"), "country_name");
    assert_eq!(standardize_slug("  GDP (current US$) "), "gdp_current_us");
    assert_eq!(standardize_slug("year"), "year");
}
