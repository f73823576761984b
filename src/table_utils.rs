//! Pure input-normalization and column store helpers.
//!
//! None of these functions touch a table: they take column stores, rows or
//! matrices and build new ones. Unchanged columns are shared through their
//! `Arc` rather than copied.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::column_types::ColumnTypeName;
use crate::constants::{
    DATE_SLUG, DAY_SLUG, ENTITY_CODE_SLUG, ENTITY_ID_SLUG, ENTITY_NAME_SLUG, KEY_SEPARATOR,
    QUARTER_SLUG, YEAR_SLUG,
};
use crate::delimited::{detect_delimiter, guess_column_type, join_record, split_delimited};
use crate::types::{CellValue, ColumnDef, ColumnStore, MISSING, Row, SortOrder};

// ============================================================================
// Rows
// ============================================================================

/// Pivot rows into columns. Slugs appear in first-seen order; a row without a
/// slug gets the missing placeholder.
pub fn rows_to_column_store(rows: &[Row]) -> ColumnStore {
    let mut slugs: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in rows {
        for slug in row.keys() {
            if seen.insert(slug.as_str()) {
                slugs.push(slug.as_str());
            }
        }
    }

    let mut store = ColumnStore::new();
    for slug in slugs {
        let values: Vec<CellValue> = rows
            .iter()
            .map(|row| row.get(slug).cloned().unwrap_or(MISSING))
            .collect();
        store.insert(slug, values);
    }
    store
}

/// Row `index` of `store`, one entry per column
pub fn make_row_from_column_store(index: usize, store: &ColumnStore) -> Row {
    store
        .columns()
        .map(|(slug, values)| {
            (
                slug.to_string(),
                values.get(index).cloned().unwrap_or(MISSING),
            )
        })
        .collect()
}

pub fn column_store_to_rows(store: &ColumnStore) -> Vec<Row> {
    (0..store.num_rows())
        .map(|i| make_row_from_column_store(i, store))
        .collect()
}

// ============================================================================
// Matrices
// ============================================================================

fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Drop trailing blank rows and trailing blank columns
pub fn trim_matrix(matrix: &[Vec<CellValue>]) -> Vec<Vec<CellValue>> {
    let num_rows = matrix
        .iter()
        .rposition(|row| !row.iter().all(is_blank))
        .map(|i| i + 1)
        .unwrap_or(0);
    let rows = &matrix[..num_rows];

    let width = rows
        .iter()
        .map(|row| row.iter().rposition(|v| !is_blank(v)).map(|i| i + 1).unwrap_or(0))
        .max()
        .unwrap_or(0);

    rows.iter()
        .map(|row| {
            let mut out: Vec<CellValue> = row.iter().take(width).cloned().collect();
            out.resize(width, CellValue::Text(String::new()));
            out
        })
        .collect()
}

fn header_slugs(header: &[CellValue]) -> Vec<String> {
    header.iter().map(|v| v.to_string()).collect()
}

/// First row is the header. Ragged rows are padded with the missing
/// placeholder and cut to the header width.
pub fn matrix_to_column_store(matrix: &[Vec<CellValue>]) -> ColumnStore {
    let Some((header, body)) = matrix.split_first() else {
        return ColumnStore::new();
    };
    let mut store = ColumnStore::new();
    for (i, slug) in header_slugs(header).into_iter().enumerate() {
        let values: Vec<CellValue> = body
            .iter()
            .map(|row| row.get(i).cloned().unwrap_or(MISSING))
            .collect();
        store.insert(slug, values);
    }
    store
}

pub fn rows_from_matrix(matrix: &[Vec<CellValue>]) -> Vec<Row> {
    column_store_to_rows(&matrix_to_column_store(matrix))
}

/// Render a matrix as delimited text; error cells render empty
pub fn matrix_to_delimited(matrix: &[Vec<CellValue>], delimiter: char) -> String {
    matrix
        .iter()
        .map(|row| {
            let fields: Vec<String> = row
                .iter()
                .map(|v| match v {
                    CellValue::Error(_) | CellValue::Null => String::new(),
                    other => other.to_string(),
                })
                .collect();
            join_record(&fields, delimiter)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Delimited text
// ============================================================================

/// Result of [`parse_delimited`]
#[derive(Clone, Debug, Default)]
pub struct DelimitedParse {
    /// Raw text cells keyed by header
    pub store: ColumnStore,
    /// Autotype guess per header, in header order
    pub guessed_types: Vec<(String, ColumnTypeName)>,
    /// Definitions renaming headers that are not clean slugs
    pub renames: Vec<ColumnDef>,
    pub delimiter: char,
}

/// Split delimited text into a raw column store and guess column types.
///
/// The delimiter is detected when not given. Every cell stays `Text`; typing
/// happens when the table parses its columns.
pub fn parse_delimited(text: &str, delimiter: Option<char>, sample_size: usize) -> DelimitedParse {
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));
    let records = split_delimited(text, delimiter);
    let Some((header, body)) = records.split_first() else {
        return DelimitedParse {
            delimiter,
            ..Default::default()
        };
    };

    let mut parsed = DelimitedParse {
        delimiter,
        ..Default::default()
    };
    for (i, slug) in header.iter().enumerate() {
        let raw: Vec<&str> = body
            .iter()
            .map(|record| record.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        parsed
            .guessed_types
            .push((slug.clone(), guess_column_type(raw.iter().copied(), sample_size)));

        let standardized = standardize_slug(slug);
        if standardized != *slug && !standardized.is_empty() {
            parsed
                .renames
                .push(ColumnDef::new(standardized).with_name(slug.clone()));
        }

        let values: Vec<CellValue> = raw.into_iter().map(CellValue::from).collect();
        parsed.store.insert(slug.clone(), values);
    }
    parsed
}

/// `"Country Name"` -> `"country_name"`
pub fn standardize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}

// ============================================================================
// Keys, concatenation, reshaping
// ============================================================================

/// Build a function mapping a row index to a key joining the given columns
pub fn make_key_fn<'a>(store: &'a ColumnStore, slugs: &[String]) -> impl Fn(usize) -> String + 'a {
    let columns: Vec<Option<&'a [CellValue]>> = slugs.iter().map(|slug| store.get(slug)).collect();
    move |index| {
        columns
            .iter()
            .map(|column| {
                column
                    .and_then(|values| values.get(index))
                    .unwrap_or(&MISSING)
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

/// Stack stores vertically. The slug set is the union in first-seen order;
/// a store lacking a slug contributes placeholders for its rows.
pub fn concat_column_stores(stores: &[&ColumnStore]) -> ColumnStore {
    let mut slugs: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for store in stores {
        for slug in store.slugs() {
            if seen.insert(slug.as_str()) {
                slugs.push(slug.as_str());
            }
        }
    }

    let total_rows: usize = stores.iter().map(|s| s.num_rows()).sum();
    let mut out = ColumnStore::new();
    for slug in slugs {
        let mut values = Vec::with_capacity(total_rows);
        for store in stores {
            match store.get(slug) {
                Some(column) => values.extend_from_slice(column),
                None => values.extend(std::iter::repeat_n(MISSING, store.num_rows())),
            }
        }
        out.insert(slug, values);
    }
    out
}

/// Rename columns in place, keeping positions and sharing values.
///
/// A column that is not renamed but whose slug is a rename target is
/// replaced by the renamed column. When several columns are renamed to the
/// same slug the last one wins, at the first one's position.
pub fn rename_column_store(store: &ColumnStore, renames: &HashMap<String, String>) -> ColumnStore {
    let mut out = ColumnStore::new();
    for (slug, values) in store.columns() {
        match renames.get(slug) {
            Some(new_slug) => out.insert(new_slug.as_str(), Arc::clone(values)),
            None if is_rename_target(renames, slug) => {}
            None => out.insert(slug, Arc::clone(values)),
        }
    }
    out
}

/// Whether `slug` is the new name of some renamed column
pub fn is_rename_target(renames: &HashMap<String, String>, slug: &str) -> bool {
    renames.values().any(|new_slug| new_slug == slug)
}

/// Keep the given columns, in the given order; unknown slugs are skipped
pub fn select_column_store(store: &ColumnStore, slugs: &[String]) -> ColumnStore {
    let mut out = ColumnStore::new();
    for slug in slugs {
        if let Some(values) = store.get_shared(slug) {
            out.insert(slug.clone(), Arc::clone(values));
        }
    }
    out
}

pub fn reverse_column_store(store: &ColumnStore) -> ColumnStore {
    let indices: Vec<usize> = (0..store.num_rows()).rev().collect();
    take_rows(store, &indices)
}

/// New store holding the rows at `indices`, in that order
pub(crate) fn take_rows(store: &ColumnStore, indices: &[usize]) -> ColumnStore {
    let mut out = ColumnStore::new();
    for (slug, values) in store.columns() {
        let taken: Vec<CellValue> = indices
            .iter()
            .map(|&i| values.get(i).cloned().unwrap_or(MISSING))
            .collect();
        out.insert(slug, taken);
    }
    out
}

/// Stable multi-key sort. Returns the same `Arc` when the rows are already in
/// order.
pub fn sort_column_store(
    store: &Arc<ColumnStore>,
    slugs: &[String],
    orders: &[SortOrder],
) -> Arc<ColumnStore> {
    let keys: Vec<(&[CellValue], SortOrder)> = slugs
        .iter()
        .enumerate()
        .filter_map(|(i, slug)| {
            let order = orders.get(i).copied().unwrap_or_default();
            store.get(slug).map(|values| (values, order))
        })
        .collect();

    let mut indices: Vec<usize> = (0..store.num_rows()).collect();
    indices.sort_by(|&a, &b| {
        for (values, order) in &keys {
            let ord = values[a].sort_cmp(&values[b]);
            let ord = match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord.is_ne() {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });

    if indices.iter().enumerate().all(|(pos, &i)| pos == i) {
        return Arc::clone(store);
    }
    Arc::new(take_rows(store, &indices))
}

// ============================================================================
// Random corruption
// ============================================================================

/// `how_many` distinct row indices chosen by a seeded shuffle, ascending
pub fn get_drop_indexes(num_rows: usize, how_many: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..num_rows).collect();
    indices.shuffle(&mut rng);
    indices.truncate(how_many.min(num_rows));
    indices.sort_unstable();
    indices
}

/// Replace `how_many` cells in each of `slugs` with `replace(old)`.
/// Untouched columns are shared.
pub fn replace_random_cells_in_column_store<F>(
    store: &ColumnStore,
    how_many: usize,
    slugs: &[String],
    seed: u64,
    replace: F,
) -> ColumnStore
where
    F: Fn(&CellValue) -> CellValue,
{
    let targets: HashSet<&str> = slugs.iter().map(String::as_str).collect();
    let drop_indexes = get_drop_indexes(store.num_rows(), how_many, seed);

    let mut out = ColumnStore::new();
    for (slug, values) in store.columns() {
        if targets.contains(slug) {
            let mut replaced = values.as_ref().clone();
            for &i in &drop_indexes {
                replaced[i] = replace(&values[i]);
            }
            out.insert(slug, replaced);
        } else {
            out.insert(slug, Arc::clone(values));
        }
    }
    out
}

// ============================================================================
// Column definition autodetection
// ============================================================================

/// Guess a definition from a slug and one sample value
pub fn guess_column_def_from_slug_and_value(slug: &str, sample: Option<&CellValue>) -> ColumnDef {
    let by_slug = match slug {
        YEAR_SLUG => Some(ColumnTypeName::Year),
        DAY_SLUG => Some(ColumnTypeName::Day),
        DATE_SLUG => Some(ColumnTypeName::Date),
        QUARTER_SLUG => Some(ColumnTypeName::Quarter),
        ENTITY_NAME_SLUG => Some(ColumnTypeName::EntityName),
        ENTITY_CODE_SLUG => Some(ColumnTypeName::EntityCode),
        ENTITY_ID_SLUG => Some(ColumnTypeName::EntityId),
        _ => None,
    };
    let column_type = by_slug.unwrap_or(match sample {
        Some(CellValue::Number(_)) => ColumnTypeName::Numeric,
        Some(CellValue::Boolean(_)) => ColumnTypeName::Boolean,
        _ => ColumnTypeName::String,
    });
    ColumnDef::new(slug).with_type(column_type)
}

/// Definitions for every column of `store` not covered by `defined_slugs`,
/// guessed from the first real value of each column
pub fn autodetect_column_defs(store: &ColumnStore, defined_slugs: &HashSet<&str>) -> Vec<ColumnDef> {
    store
        .columns()
        .filter(|(slug, _)| !defined_slugs.contains(slug))
        .map(|(slug, values)| {
            let sample = values
                .iter()
                .find(|v| !v.is_error() && !matches!(v, CellValue::Null));
            guess_column_def_from_slug_and_value(slug, sample)
        })
        .collect()
}
