//! Boolean row selection.
//!
//! A mask that keeps every row is a no-op: applying it hands back the very
//! same column store instead of a copy.

use std::collections::HashSet;
use std::sync::Arc;

use crate::table_utils::take_rows;
use crate::types::ColumnStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterMask {
    mask: Vec<bool>,
    num_kept: usize,
}

impl FilterMask {
    pub fn new(mask: Vec<bool>) -> Self {
        let num_kept = mask.iter().filter(|&&keep| keep).count();
        Self { mask, num_kept }
    }

    /// Mask marking `indices` with `keep`, every other row with `!keep`
    pub fn from_indices(num_rows: usize, indices: &[usize], keep: bool) -> Self {
        let targets: HashSet<usize> = indices.iter().copied().collect();
        Self::new(
            (0..num_rows)
                .map(|i| targets.contains(&i) == keep)
                .collect(),
        )
    }

    pub fn from_predicate<F>(num_rows: usize, predicate: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        Self::new((0..num_rows).map(predicate).collect())
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// True when every row is kept
    pub fn is_noop(&self) -> bool {
        self.num_kept == self.mask.len()
    }

    pub fn num_kept(&self) -> usize {
        self.num_kept
    }

    pub fn keeps(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn keep_indexes(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect()
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.mask.iter().map(|keep| !keep).collect())
    }

    /// Keep rows kept by both masks
    pub fn and(&self, other: &FilterMask) -> Self {
        Self::new(
            self.mask
                .iter()
                .zip(other.mask.iter())
                .map(|(a, b)| *a && *b)
                .collect(),
        )
    }

    /// Apply to a store. A no-op mask returns the same `Arc`.
    ///
    /// A mask of the wrong length is never a no-op: rows past its end are
    /// dropped and entries past the end of the store are ignored.
    pub fn apply(&self, store: &Arc<ColumnStore>) -> Arc<ColumnStore> {
        let num_rows = store.num_rows();
        if self.mask.len() != num_rows {
            tracing::warn!(
                mask_rows = self.mask.len(),
                store_rows = num_rows,
                "filter mask length differs from the store"
            );
        } else if self.is_noop() {
            tracing::trace!(rows = num_rows, "filter mask is a no-op");
            return Arc::clone(store);
        }
        let keep: Vec<usize> = self
            .keep_indexes()
            .into_iter()
            .take_while(|&i| i < num_rows)
            .collect();
        Arc::new(take_rows(store, &keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn store() -> Arc<ColumnStore> {
        Arc::new(
            ColumnStore::from_columns(vec![
                ("a", (0..4).map(|i| CellValue::from(i)).collect::<Vec<_>>()),
                ("b", (10..14).map(|i| CellValue::from(i)).collect::<Vec<_>>()),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_noop_returns_same_store() {
        let store = store();
        let mask = FilterMask::new(vec![true; 4]);
        assert!(mask.is_noop());
        assert!(Arc::ptr_eq(&mask.apply(&store), &store));
    }

    #[test]
    fn test_apply_keeps_selected_rows() {
        let store = store();
        let mask = FilterMask::from_indices(4, &[1, 3], true);
        assert_eq!(mask.num_kept(), 2);
        assert_eq!(mask.keep_indexes(), vec![1, 3]);
        let out = mask.apply(&store);
        assert_eq!(out.get("b"), Some(&[CellValue::from(11), CellValue::from(13)][..]));
    }

    #[test]
    fn test_from_indices_drop() {
        let mask = FilterMask::from_indices(4, &[0], false);
        assert_eq!(mask.keep_indexes(), vec![1, 2, 3]);
        assert_eq!(mask.inverse().keep_indexes(), vec![0]);
    }

    #[test]
    fn test_and_and_predicate() {
        let even = FilterMask::from_predicate(6, |i| i % 2 == 0);
        let small = FilterMask::from_predicate(6, |i| i < 3);
        assert_eq!(even.and(&small).keep_indexes(), vec![0, 2]);
        assert!(!even.keeps(1));
        assert!(!even.keeps(100));
    }

    #[test]
    fn test_empty_mask_is_noop() {
        let mask = FilterMask::new(Vec::new());
        assert!(mask.is_noop());
        assert!(mask.is_empty());
    }

    #[test]
    fn test_mask_of_wrong_length_is_not_a_noop() {
        let store = store();

        let short = FilterMask::new(vec![true; 2]);
        let out = short.apply(&store);
        assert!(!Arc::ptr_eq(&out, &store));
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.get("a"), Some(&[CellValue::from(0), CellValue::from(1)][..]));

        let long = FilterMask::new(vec![true; 6]);
        let out = long.apply(&store);
        assert_eq!(out.num_rows(), 4);
        assert_eq!(out.get("b"), store.get("b"));
    }
}
