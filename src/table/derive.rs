//! Operations that add rows or columns: completion, concatenation,
//! combining, duplicating and appending.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{CoreTable, parse_all, parse_if_needed};
use crate::constants::ORIGINAL_TIME_SUFFIX;
use crate::error::{TableError, TableResult};
use crate::perf::ScopedTimer;
use crate::table_utils::{concat_column_stores, rows_to_column_store};
use crate::types::{
    CellKey, CellValue, ColumnDef, ColumnDefPatch, ColumnStore, ColumnValues, MISSING, Row,
    TransformCategory,
};

/// A cell paired with the time it was observed at
#[derive(Clone, Debug, PartialEq)]
pub struct TimedValue {
    pub value: CellValue,
    pub time: CellValue,
}

fn cell_at(values: Option<&ColumnValues>, index: usize) -> CellValue {
    values
        .and_then(|values| values.get(index))
        .cloned()
        .unwrap_or(MISSING)
}

/// `defs` with `def` replacing the definition of the same slug, or appended
fn upsert_def(defs: &[ColumnDef], def: ColumnDef) -> Vec<ColumnDef> {
    let mut out = defs.to_vec();
    match out.iter().position(|d| d.slug == def.slug) {
        Some(i) => out[i] = def,
        None => out.push(def),
    }
    out
}

impl CoreTable {
    /// Build `new_def` row by row from `f(values, time)`.
    ///
    /// `values` maps each of `slugs` to its cell and that cell's time. The
    /// time comes from a `<slug>-originalTime` column when the table has one,
    /// else from the table's time column.
    pub fn combine_columns<F>(&self, slugs: &[&str], new_def: ColumnDef, f: F) -> CoreTable
    where
        F: Fn(&HashMap<String, TimedValue>, &CellValue) -> CellValue,
    {
        let store = self.column_store();
        let time_column = self.time_column();
        let row_times = (!time_column.is_missing()).then(|| Arc::clone(time_column.shared_values()));

        let sources: Vec<(&str, Option<&ColumnValues>, Option<&ColumnValues>)> = slugs
            .iter()
            .map(|slug| {
                let original_time = format!("{}{}", slug, ORIGINAL_TIME_SUFFIX);
                let times = store.get_shared(&original_time).or(row_times.as_ref());
                (*slug, store.get_shared(slug), times)
            })
            .collect();

        let combined: Vec<CellValue> = (0..self.num_rows())
            .map(|i| {
                let values: HashMap<String, TimedValue> = sources
                    .iter()
                    .map(|(slug, values, times)| {
                        (
                            slug.to_string(),
                            TimedValue {
                                value: cell_at(*values, i),
                                time: cell_at(*times, i),
                            },
                        )
                    })
                    .collect();
                f(&values, &cell_at(row_times.as_ref(), i))
            })
            .collect();

        let combined = parse_all(&new_def, &combined);
        let mut out = store.as_ref().clone();
        out.insert(new_def.slug.clone(), combined);
        let label = format!("combine [{}] into {}", slugs.join(", "), new_def.slug);
        let defs = upsert_def(&self.defs, new_def);
        self.derived(Arc::new(out), defs, label, TransformCategory::CombineColumns)
    }

    /// Add a row for every `(a, b)` combination of the unique values of the
    /// two columns that does not exist yet.
    ///
    /// Existing rows keep their order. Synthesized rows follow, ordered by the
    /// first-seen order of `a` then `b`, and hold the placeholder in every
    /// other column.
    pub fn complete(&self, slugs: &[&str]) -> TableResult<CoreTable> {
        let &[slug_a, slug_b] = slugs else {
            return Err(TableError::CompleteRequiresTwoColumns { got: slugs.len() });
        };
        let _timer = ScopedTimer::new("complete", self.config.slow_operation_ms);

        let column_a = self.get(slug_a);
        let column_b = self.get(slug_b);
        let values_a = column_a.values_including_error_values();
        let values_b = column_b.values_including_error_values();
        let uniques_a = column_a.unique_values();
        let uniques_b = column_b.unique_values();

        let mut existing: HashMap<CellKey<'_>, HashSet<CellKey<'_>>> = HashMap::new();
        let mut error_key_rows = 0;
        for (a, b) in values_a.iter().zip(values_b) {
            if a.is_error() || b.is_error() {
                error_key_rows += 1;
                continue;
            }
            existing.entry(CellKey(a)).or_default().insert(CellKey(b));
        }

        let mut new_a = Vec::new();
        let mut new_b = Vec::new();
        for &a in &uniques_a {
            let present = existing.get(&CellKey(a));
            for &b in &uniques_b {
                if !present.is_some_and(|set| set.contains(&CellKey(b))) {
                    new_a.push(a.clone());
                    new_b.push(b.clone());
                }
            }
        }

        let max = uniques_a.len() * uniques_b.len() + error_key_rows;
        let rows = self.num_rows() + new_a.len();
        if rows > max {
            return Err(TableError::CompletionOverflow { rows, max });
        }

        let label = format!("complete [{}, {}]", slug_a, slug_b);
        if new_a.is_empty() {
            tracing::trace!(%label, "every combination present");
            return Ok(self.derived(
                Arc::clone(self.column_store()),
                self.defs.clone(),
                format!("{} (no-op)", label),
                TransformCategory::AppendRows,
            ));
        }

        let mut synthesized = ColumnStore::new();
        synthesized.insert(slug_a, new_a);
        synthesized.insert(slug_b, new_b);
        let store = concat_column_stores(&[self.column_store().as_ref(), &synthesized]);
        Ok(self.derived(
            Arc::new(store),
            self.defs.clone(),
            label,
            TransformCategory::AppendRows,
        ))
    }

    /// Stack this table and `others`. Columns are the union of all slugs; a
    /// table lacking a column contributes placeholders. When tables disagree
    /// on a definition, the later one wins and the column is re-parsed.
    pub fn concat(&self, others: &[&CoreTable], label: &str) -> TableResult<CoreTable> {
        crate::profile_scope!("concat", self.config.slow_operation_ms);
        let tables: Vec<&CoreTable> = std::iter::once(self).chain(others.iter().copied()).collect();
        let stores: Vec<&ColumnStore> = tables.iter().map(|t| t.column_store().as_ref()).collect();
        let store = concat_column_stores(&stores);

        let mut defs: Vec<ColumnDef> = Vec::new();
        for table in &tables {
            for def in &table.defs {
                defs = upsert_def(&defs, def.clone());
            }
        }
        self.rebuilt(Arc::new(store), defs, label, TransformCategory::Concat)
    }

    /// Alias the values of `slug` under the definition `patch` makes from
    /// it. The values are shared unless the new type needs a parse.
    pub fn duplicate_column(&self, slug: &str, patch: ColumnDefPatch) -> CoreTable {
        let source = self.def(slug).cloned().unwrap_or_else(|| ColumnDef::new(slug));
        let def = patch.apply(&source);
        let values = self
            .column_values(slug)
            .unwrap_or_else(|| Arc::new(vec![MISSING; self.num_rows()]));
        let values = parse_if_needed(&def, &values).unwrap_or(values);

        let mut store = self.column_store().as_ref().clone();
        store.insert(def.slug.clone(), values);
        let label = format!("duplicate {} as {}", slug, def.slug);
        let defs = upsert_def(&self.defs, def);
        self.derived(Arc::new(store), defs, label, TransformCategory::AppendColumns)
    }

    /// Add columns given by inline values or transforms. Defs with neither
    /// yield placeholder columns.
    pub fn append_columns(&self, defs: Vec<ColumnDef>) -> TableResult<CoreTable> {
        let label = format!(
            "append columns [{}]",
            defs.iter().map(|d| d.slug.as_str()).collect::<Vec<_>>().join(", ")
        );
        let mut all = self.defs.clone();
        for def in defs {
            all = upsert_def(&all, def);
        }
        self.rebuilt(
            Arc::clone(self.column_store()),
            all,
            label,
            TransformCategory::AppendColumns,
        )
    }

    /// Append raw rows. They are parsed per this table's definitions first;
    /// keys the table has no column for are dropped.
    pub fn append_rows(&self, rows: &[Row], label: &str) -> CoreTable {
        let raw = rows_to_column_store(rows);
        let mut appended = ColumnStore::new();
        for def in &self.defs {
            let values = match raw.get(&def.slug) {
                Some(values) => parse_all(def, values),
                None => vec![MISSING; rows.len()],
            };
            appended.insert(def.slug.clone(), values);
        }
        let store = concat_column_stores(&[self.column_store().as_ref(), &appended]);
        self.derived(
            Arc::new(store),
            self.defs.clone(),
            label,
            TransformCategory::AppendRows,
        )
    }

    /// Re-derive with every definition passed through `f`. Slugs cannot be
    /// changed this way; use `rename_columns`.
    pub fn update_defs<F>(&self, mut f: F) -> TableResult<CoreTable>
    where
        F: FnMut(&ColumnDef) -> ColumnDef,
    {
        let defs: Vec<ColumnDef> = self
            .defs
            .iter()
            .map(|def| {
                let mut updated = f(def);
                updated.slug = def.slug.clone();
                updated
            })
            .collect();
        self.rebuilt(
            Arc::clone(self.column_store()),
            defs,
            "update column defs",
            TransformCategory::UpdateColumnDefs,
        )
    }
}
