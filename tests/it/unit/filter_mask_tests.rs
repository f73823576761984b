//! Unit tests for FilterMask.

use crate::helpers::num;
use coretable::{ColumnStore, CoreTable, FilterMask};
use std::sync::Arc;

fn store() -> Arc<ColumnStore> {
    Arc::new(
        ColumnStore::from_columns([("v", vec![num(1.0), num(2.0), num(3.0), num(4.0)])]).unwrap(),
    )
}

#[test]
fn test_all_true_mask_returns_same_store() {
    let store = store();
    let mask = FilterMask::new(vec![true; 4]);
    assert!(mask.is_noop());
    assert!(Arc::ptr_eq(&mask.apply(&store), &store));
}

#[test]
fn test_apply_keeps_selected_rows_in_order() {
    let store = store();
    let mask = FilterMask::from_indices(4, &[3, 1], true);
    assert_eq!(mask.keep_indexes(), vec![1, 3]);
    let filtered = mask.apply(&store);
    assert_eq!(filtered.get("v").unwrap(), &[num(2.0), num(4.0)]);
}

#[test]
fn test_exclude_inverse_and_combination() {
    let exclude = FilterMask::from_indices(4, &[0], false);
    assert_eq!(exclude.num_kept(), 3);
    assert_eq!(exclude.inverse().keep_indexes(), vec![0]);

    let even = FilterMask::from_predicate(4, |i| i % 2 == 0);
    assert_eq!(exclude.and(&even).keep_indexes(), vec![2]);
    assert!(!even.keeps(7));
}

#[test]
fn test_short_mask_filters_a_table() {
    let table = CoreTable::new("v\n1\n2\n3\n", vec![]).unwrap();
    let filtered = table.filter_by_mask(&FilterMask::new(vec![true, true]), "first two");
    assert_eq!(filtered.num_rows(), 2);
    assert_eq!(filtered.get("v").numeric_values(), vec![1.0, 2.0]);
    assert!(!Arc::ptr_eq(filtered.column_store(), table.column_store()));
}
