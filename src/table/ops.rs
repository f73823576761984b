//! Row filters, ordering, projection, renaming and cell replacement.
//!
//! Every operation returns a new table. When an operation leaves the rows
//! untouched the child shares its parent's store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{CoreTable, dedupe_defs};
use crate::error_values::ErrorValue;
use crate::filter_mask::FilterMask;
use crate::perf::ScopedTimer;
use crate::table_utils::{
    is_rename_target, rename_column_store, replace_random_cells_in_column_store,
    reverse_column_store, select_column_store, sort_column_store,
};
use crate::types::{CellValue, ColumnStore, MISSING, Row, SortOrder, TransformCategory};

fn owned(slugs: &[&str]) -> Vec<String> {
    slugs.iter().map(|s| s.to_string()).collect()
}

impl CoreTable {
    // ========================================================================
    // Row filters
    // ========================================================================

    /// Keep the rows selected by `mask`. A mask keeping everything yields a
    /// child sharing this table's store.
    pub fn filter_by_mask(&self, mask: &FilterMask, label: &str) -> CoreTable {
        let store = self.column_store();
        let filtered = mask.apply(store);
        let label = if Arc::ptr_eq(&filtered, store) {
            format!("{} (no-op)", label)
        } else {
            label.to_string()
        };
        self.derived(filtered, self.defs.clone(), label, TransformCategory::FilterRows)
    }

    /// Keep rows for which `predicate(row, index)` holds
    pub fn row_filter<F>(&self, predicate: F, label: &str) -> CoreTable
    where
        F: Fn(&Row, usize) -> bool,
    {
        let rows = self.rows();
        let mask = FilterMask::from_predicate(self.num_rows(), |i| predicate(&rows[i], i));
        self.filter_by_mask(&mask, label)
    }

    /// Keep rows for which `predicate(value, index)` holds on column `slug`
    pub fn column_filter<F>(&self, slug: &str, predicate: F, label: &str) -> CoreTable
    where
        F: Fn(&CellValue, usize) -> bool,
    {
        let values = self.column_values(slug);
        let mask = FilterMask::from_predicate(self.num_rows(), |i| {
            let value = values
                .as_ref()
                .and_then(|values| values.get(i))
                .unwrap_or(&MISSING);
            predicate(value, i)
        });
        self.filter_by_mask(&mask, label)
    }

    pub fn drop_rows_at(&self, indices: &[usize]) -> CoreTable {
        let mask = FilterMask::from_indices(self.num_rows(), indices, false);
        self.filter_by_mask(&mask, &format!("drop {} rows", indices.len()))
    }

    /// Keep at most `count` rows starting at `offset`
    pub fn limit(&self, count: usize, offset: usize) -> CoreTable {
        let end = offset.saturating_add(count);
        let mask = FilterMask::from_predicate(self.num_rows(), |i| i >= offset && i < end);
        self.filter_by_mask(&mask, &format!("limit {} offset {}", count, offset))
    }

    fn error_mask(&self, slugs: &[&str], all: bool) -> FilterMask {
        let columns: Vec<Option<_>> = slugs.iter().map(|slug| self.column_values(slug)).collect();
        let is_error = |column: &Option<crate::types::ColumnValues>, i: usize| {
            column
                .as_ref()
                .and_then(|values| values.get(i))
                .map(CellValue::is_error)
                .unwrap_or(true)
        };
        FilterMask::from_predicate(self.num_rows(), |i| {
            if columns.is_empty() {
                return true;
            }
            if all {
                !columns.iter().all(|c| is_error(c, i))
            } else {
                !columns.iter().any(|c| is_error(c, i))
            }
        })
    }

    /// Drop rows holding an error value in any of `slugs`
    pub fn drop_rows_with_error_values_for_any_column(&self, slugs: &[&str]) -> CoreTable {
        let mask = self.error_mask(slugs, false);
        self.filter_by_mask(
            &mask,
            &format!("drop rows with errors in any of [{}]", slugs.join(", ")),
        )
    }

    /// Drop rows holding error values in every one of `slugs`
    pub fn drop_rows_with_error_values_for_all_columns(&self, slugs: &[&str]) -> CoreTable {
        let mask = self.error_mask(slugs, true);
        self.filter_by_mask(
            &mask,
            &format!("drop rows with errors in all of [{}]", slugs.join(", ")),
        )
    }

    // ========================================================================
    // Ordering and shape
    // ========================================================================

    pub fn sort_by(&self, slugs: &[&str]) -> CoreTable {
        self.sort_by_with_orders(slugs, &[])
    }

    /// Stable multi-key sort; orders default to ascending
    pub fn sort_by_with_orders(&self, slugs: &[&str], orders: &[SortOrder]) -> CoreTable {
        let _timer = ScopedTimer::new("sort_by", self.config.slow_operation_ms);
        let store = self.column_store();
        let sorted = sort_column_store(store, &owned(slugs), orders);
        let label = if Arc::ptr_eq(&sorted, store) {
            format!("sort by [{}] (no-op)", slugs.join(", "))
        } else {
            format!("sort by [{}]", slugs.join(", "))
        };
        self.derived(sorted, self.defs.clone(), label, TransformCategory::SortRows)
    }

    pub fn reverse(&self) -> CoreTable {
        let store = Arc::new(reverse_column_store(self.column_store()));
        self.derived(store, self.defs.clone(), "reverse", TransformCategory::SortRows)
    }

    /// Keep only `slugs`, in that order. Unknown slugs are ignored.
    pub fn select(&self, slugs: &[&str]) -> CoreTable {
        let defs: Vec<_> = slugs
            .iter()
            .filter_map(|slug| self.def(slug).cloned())
            .collect();
        let kept: Vec<String> = defs.iter().map(|d| d.slug.clone()).collect();
        let store = Arc::new(select_column_store(self.column_store(), &kept));
        self.derived(
            store,
            defs,
            format!("select [{}]", kept.join(", ")),
            TransformCategory::FilterColumns,
        )
    }

    pub fn drop_columns(&self, slugs: &[&str]) -> CoreTable {
        let dropped: HashSet<&str> = slugs.iter().copied().collect();
        let defs: Vec<_> = self
            .defs
            .iter()
            .filter(|d| !dropped.contains(d.slug.as_str()))
            .cloned()
            .collect();
        let kept: Vec<String> = defs.iter().map(|d| d.slug.clone()).collect();
        let store = Arc::new(select_column_store(self.column_store(), &kept));
        self.derived(
            store,
            defs,
            format!("drop [{}]", slugs.join(", ")),
            TransformCategory::FilterColumns,
        )
    }

    pub fn rename_column(&self, old_slug: &str, new_slug: &str) -> CoreTable {
        self.rename_columns([(old_slug, new_slug)])
    }

    /// Rename store keys and definitions together. Renaming onto an existing
    /// slug replaces that column.
    pub fn rename_columns<'a, I>(&self, renames: I) -> CoreTable
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let renames: HashMap<String, String> = renames
            .into_iter()
            .filter(|(old, _)| self.has(old))
            .map(|(old, new)| (old.to_string(), new.to_string()))
            .collect();
        let defs = dedupe_defs(
            self.defs
                .iter()
                .filter_map(|def| match renames.get(&def.slug) {
                    Some(new_slug) => {
                        let mut def = def.clone();
                        def.slug = new_slug.clone();
                        Some(def)
                    }
                    None if is_rename_target(&renames, &def.slug) => None,
                    None => Some(def.clone()),
                })
                .collect(),
        );
        let store = Arc::new(rename_column_store(self.column_store(), &renames));
        let mut pairs: Vec<String> = renames
            .iter()
            .map(|(old, new)| format!("{} -> {}", old, new))
            .collect();
        pairs.sort();
        self.derived(
            store,
            defs,
            format!("rename [{}]", pairs.join(", ")),
            TransformCategory::RenameColumns,
        )
    }

    // ========================================================================
    // Cell replacement
    // ========================================================================

    fn map_columns<F>(&self, slugs: &[&str], f: F, label: String) -> CoreTable
    where
        F: Fn(&CellValue) -> CellValue,
    {
        let targets: HashSet<&str> = slugs.iter().copied().collect();
        let mut store = ColumnStore::new();
        for (slug, values) in self.column_store().columns() {
            if targets.contains(slug) {
                store.insert(slug, values.iter().map(&f).collect::<Vec<_>>());
            } else {
                store.insert(slug, Arc::clone(values));
            }
        }
        self.derived(
            Arc::new(store),
            self.defs.clone(),
            label,
            TransformCategory::UpdateRows,
        )
    }

    /// Replace every cell of `slugs` with `f(cell)`
    pub fn replace_cells<F>(&self, slugs: &[&str], f: F) -> CoreTable
    where
        F: Fn(&CellValue) -> CellValue,
    {
        self.map_columns(slugs, f, format!("replace cells in [{}]", slugs.join(", ")))
    }

    /// Zero and negative numbers become `InvalidOnALogScale`
    pub fn replace_non_positive_cells_for_log_scale(&self, slugs: &[&str]) -> CoreTable {
        self.map_columns(
            slugs,
            |v| match v {
                CellValue::Number(n) if *n <= 0.0 => {
                    CellValue::Error(ErrorValue::InvalidOnALogScale)
                }
                other => other.clone(),
            },
            format!("replace non-positive cells in [{}]", slugs.join(", ")),
        )
    }

    pub fn replace_negative_cells_with_error_values(&self, slugs: &[&str]) -> CoreTable {
        self.map_columns(
            slugs,
            |v| match v {
                CellValue::Number(n) if *n < 0.0 => CellValue::Error(ErrorValue::InvalidNegativeValue),
                other => other.clone(),
            },
            format!("replace negative cells in [{}]", slugs.join(", ")),
        )
    }

    pub fn replace_non_numeric_cells_with_error_values(&self, slugs: &[&str]) -> CoreTable {
        self.map_columns(
            slugs,
            |v| match v {
                CellValue::Number(n) if !n.is_nan() => v.clone(),
                CellValue::Error(_) => v.clone(),
                _ => CellValue::Error(ErrorValue::NaNButShouldBeNumber),
            },
            format!("replace non-numeric cells in [{}]", slugs.join(", ")),
        )
    }

    /// Replace `how_many` seeded-random cells of each of `slugs` with
    /// `DroppedForTesting`
    pub fn replace_random_cells(&self, how_many: usize, slugs: &[&str], seed: u64) -> CoreTable {
        self.replace_random_cells_with(how_many, slugs, seed, |_| {
            CellValue::Error(ErrorValue::DroppedForTesting)
        })
    }

    pub fn replace_random_cells_with<F>(
        &self,
        how_many: usize,
        slugs: &[&str],
        seed: u64,
        replace: F,
    ) -> CoreTable
    where
        F: Fn(&CellValue) -> CellValue,
    {
        let store = replace_random_cells_in_column_store(
            self.column_store(),
            how_many,
            &owned(slugs),
            seed,
            replace,
        );
        self.derived(
            Arc::new(store),
            self.defs.clone(),
            format!("replace {} random cells in [{}]", how_many, slugs.join(", ")),
            TransformCategory::UpdateRows,
        )
    }
}
