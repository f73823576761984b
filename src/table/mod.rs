//! The `CoreTable` engine.
//!
//! A table is immutable. It is built once from raw input plus column
//! definitions, and every transformation returns a new table linked to its
//! parent through a [`ProvenanceRecord`]. Parsing and transform application
//! are deferred until the column store is first read, then cached.
//!
//! Operations live in submodules:
//! - `ops`: row filters, sorting, projection, renaming, cell replacement
//! - `derive`: completion, concatenation, combining and appending columns
//! - `export`: CSV/TSV and matrix output
//! - `provenance`: ancestry and diagnostics

mod derive;
mod export;
mod ops;
mod provenance;

pub use derive::TimedValue;
pub use provenance::ProvenanceRecord;

use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::column::CoreColumn;
use crate::column_types::{ColumnTypeName, column_type};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_NUM_DECIMAL_PLACES, TIME_SLUG};
use crate::error::TableResult;
use crate::perf::ScopedTimer;
use crate::table_utils::{
    autodetect_column_defs, guess_column_def_from_slug_and_value, make_key_fn,
    make_row_from_column_store, matrix_to_column_store, parse_delimited, rows_to_column_store,
    select_column_store, trim_matrix,
};
use crate::transforms::{ColumnTransform, apply_transforms, order_transforms};
use crate::types::{
    CellValue, ColumnDef, ColumnStore, ColumnValues, InputType, MISSING, Row, TableInput,
    TransformCategory,
};

/// Construction options
#[derive(Clone, Debug, Default)]
pub struct TableOptions {
    description: Option<String>,
    category: Option<TransformCategory>,
    force_reuse_column_store: bool,
    config: Option<Arc<EngineConfig>>,
    parent: Option<Arc<ProvenanceRecord>>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: TransformCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Use a column-store input as the table's store as-is, skipping the
    /// parse pass. The store must already hold parsed values for every def.
    pub fn force_reuse_column_store(mut self) -> Self {
        self.force_reuse_column_store = true;
        self
    }

    fn with_parent(mut self, parent: Arc<ProvenanceRecord>, config: Arc<EngineConfig>) -> Self {
        self.parent = Some(parent);
        self.config = Some(config);
        self
    }
}

/// An immutable, lazily materialized table
#[derive(Debug)]
pub struct CoreTable {
    input_store: Arc<ColumnStore>,
    input_type: InputType,
    defs: Vec<ColumnDef>,
    def_index: HashMap<String, usize>,
    pending_transforms: Vec<(String, ColumnTransform)>,
    force_reuse: bool,
    store: OnceCell<Arc<ColumnStore>>,
    rows: OnceCell<Vec<Row>>,
    record: Arc<ProvenanceRecord>,
    config: Arc<EngineConfig>,
}

impl CoreTable {
    /// Build a table from raw input and column definitions.
    ///
    /// Columns present in the input without a definition get an autodetected
    /// one. Definitions without input data are filled with the missing
    /// placeholder (or their inline `values`, or their transform's output).
    pub fn new(input: impl Into<TableInput>, defs: Vec<ColumnDef>) -> TableResult<Self> {
        Self::with_options(input, defs, TableOptions::default())
    }

    pub fn with_options(
        input: impl Into<TableInput>,
        defs: Vec<ColumnDef>,
        options: TableOptions,
    ) -> TableResult<Self> {
        let input = input.into();
        let input_type = input.input_type();
        let config = options.config.clone().unwrap_or_default();

        let mut guessed: Vec<ColumnDef> = Vec::new();
        let mut input_store = match input {
            TableInput::Delimited(text) => {
                let parsed = parse_delimited(&text, None, config.autotype_sample_size);
                // A repeated header keeps one column: the last, like the store
                guessed = dedupe_defs(
                    parsed
                        .guessed_types
                        .into_iter()
                        .map(|(slug, guess)| {
                            let by_slug = guess_column_def_from_slug_and_value(&slug, None);
                            if by_slug.type_name() == ColumnTypeName::String {
                                ColumnDef::new(slug).with_type(guess)
                            } else {
                                by_slug
                            }
                        })
                        .collect(),
                );
                Arc::new(parsed.store)
            }
            TableInput::Rows(rows) => Arc::new(rows_to_column_store(&rows)),
            TableInput::Matrix(matrix) => Arc::new(matrix_to_column_store(&trim_matrix(&matrix))),
            TableInput::ColumnStore(store) => store,
        };

        let mut defs = dedupe_defs(defs);

        let inline: Vec<(String, Vec<CellValue>)> = defs
            .iter_mut()
            .filter_map(|def| def.values.take().map(|values| (def.slug.clone(), values)))
            .collect();
        if !inline.is_empty() {
            let mut store = input_store.as_ref().clone();
            for (slug, values) in inline {
                store.insert(slug, values);
            }
            input_store = Arc::new(store);
        }
        input_store.validate()?;

        let defined: HashSet<&str> = defs.iter().map(|d| d.slug.as_str()).collect();
        let detected = if input_type == InputType::Delimited {
            guessed
                .into_iter()
                .filter(|d| !defined.contains(d.slug.as_str()))
                .collect()
        } else {
            autodetect_column_defs(&input_store, &defined)
        };
        defs.extend(detected);

        let mut transforms = Vec::new();
        for def in defs.iter_mut() {
            if def.transform_has_run {
                continue;
            }
            if let Some(expression) = def.transform.as_deref() {
                transforms.push((
                    def.slug.clone(),
                    ColumnTransform::parse_for(&def.slug, expression)?,
                ));
                def.transform_has_run = true;
            }
        }
        let pending_transforms = order_transforms(transforms)?;

        let force_reuse = options.force_reuse_column_store
            && input_type == InputType::ColumnStore
            && pending_transforms.is_empty()
            && defs.iter().all(|d| input_store.has(&d.slug));
        if options.force_reuse_column_store && !force_reuse {
            tracing::trace!("column store cannot be reused as-is, rebuilding");
        }
        Ok(Self::assemble(
            input_store,
            input_type,
            defs,
            pending_transforms,
            force_reuse,
            options,
            config,
        ))
    }

    fn assemble(
        input_store: Arc<ColumnStore>,
        input_type: InputType,
        defs: Vec<ColumnDef>,
        pending_transforms: Vec<(String, ColumnTransform)>,
        preset_store: bool,
        options: TableOptions,
        config: Arc<EngineConfig>,
    ) -> Self {
        // Derived children hand over a fresh store; only caller-opted reuse counts
        let force_reuse = preset_store && options.force_reuse_column_store;
        let category = options
            .category
            .unwrap_or_else(|| TransformCategory::for_input(input_type));
        let label = options.description.unwrap_or_else(|| category.to_string());
        let parent = if config.provenance { options.parent } else { None };
        let record = Arc::new(ProvenanceRecord::new(
            label,
            category,
            input_store.num_rows(),
            defs.iter().map(|d| d.slug.clone()).collect(),
            parent,
        ));
        let def_index = defs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.slug.clone(), i))
            .collect();

        debug!(
            guid = record.guid,
            category = %record.category,
            label = %record.label,
            rows = record.num_rows,
            columns = defs.len(),
            reuse = force_reuse,
            "table created"
        );

        let store = OnceCell::new();
        if preset_store {
            let _ = store.set(Arc::clone(&input_store));
        }

        Self {
            input_store,
            input_type,
            defs,
            def_index,
            pending_transforms,
            force_reuse,
            store,
            rows: OnceCell::new(),
            record,
            config,
        }
    }

    /// Child table over an already materialized store
    pub(crate) fn derived(
        &self,
        store: Arc<ColumnStore>,
        defs: Vec<ColumnDef>,
        label: impl Into<String>,
        category: TransformCategory,
    ) -> CoreTable {
        let options = TableOptions::new()
            .with_description(label)
            .with_category(category)
            .with_parent(Arc::clone(&self.record), Arc::clone(&self.config));
        Self::assemble(
            store,
            InputType::ColumnStore,
            defs,
            Vec::new(),
            true,
            options,
            Arc::clone(&self.config),
        )
    }

    /// Child table whose store still needs the parse pass, or whose defs may
    /// carry new inline values or transforms
    pub(crate) fn rebuilt(
        &self,
        store: Arc<ColumnStore>,
        defs: Vec<ColumnDef>,
        label: impl Into<String>,
        category: TransformCategory,
    ) -> TableResult<CoreTable> {
        let options = TableOptions::new()
            .with_description(label)
            .with_category(category)
            .with_parent(Arc::clone(&self.record), Arc::clone(&self.config));
        CoreTable::with_options(TableInput::ColumnStore(store), defs, options)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// The parsed column store, materialized on first access
    pub fn column_store(&self) -> &Arc<ColumnStore> {
        self.store.get_or_init(|| self.materialize())
    }

    fn materialize(&self) -> Arc<ColumnStore> {
        let timer = ScopedTimer::new("materialize", self.config.slow_operation_ms);
        let num_rows = self.input_store.num_rows();

        let mut store = ColumnStore::new();
        for def in &self.defs {
            match self.input_store.get_shared(&def.slug) {
                Some(values) => store.insert(def.slug.clone(), Arc::clone(values)),
                None => store.insert(def.slug.clone(), vec![MISSING; num_rows]),
            }
        }

        let mut parsed = 0;
        for def in &self.defs {
            if let Some(values) = store.get_shared(&def.slug) {
                if let Some(reparsed) = parse_if_needed(def, values) {
                    store.insert(def.slug.clone(), reparsed);
                    parsed += 1;
                }
            }
        }

        apply_transforms(&mut store, &self.pending_transforms, |slug, values| {
            self.def(slug)
                .and_then(|def| parse_if_needed(def, &values))
                .unwrap_or(values)
        });

        debug!(
            guid = self.record.guid,
            rows = num_rows,
            columns = store.num_columns(),
            parsed_columns = parsed,
            transforms = self.pending_transforms.len(),
            elapsed_ms = format!("{:.2}", timer.elapsed_ms()),
            "materialized column store"
        );
        Arc::new(store)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn defs(&self) -> &[ColumnDef] {
        &self.defs
    }

    pub fn def(&self, slug: &str) -> Option<&ColumnDef> {
        self.def_index.get(slug).map(|&i| &self.defs[i])
    }

    pub fn column_slugs(&self) -> Vec<&str> {
        self.defs.iter().map(|d| d.slug.as_str()).collect()
    }

    pub fn has(&self, slug: &str) -> bool {
        self.def_index.contains_key(slug)
    }

    pub fn num_rows(&self) -> usize {
        self.record.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// True when the table shares its input store instead of rebuilding it
    pub fn reuses_column_store(&self) -> bool {
        self.force_reuse
    }

    /// Column for `slug`, or the missing-column placeholder.
    ///
    /// A configured decimal default other than the built-in one applies to
    /// every column whose display does not set its own.
    pub fn get(&self, slug: &str) -> CoreColumn {
        match (self.def(slug), self.column_values(slug)) {
            (Some(def), Some(values)) => {
                let mut def = def.clone();
                if self.config.default_num_decimal_places != DEFAULT_NUM_DECIMAL_PLACES {
                    def.display
                        .num_decimal_places
                        .get_or_insert(self.config.default_num_decimal_places);
                }
                CoreColumn::new(def, values)
            }
            _ => CoreColumn::missing(slug),
        }
    }

    pub(crate) fn column_values(&self, slug: &str) -> Option<ColumnValues> {
        self.column_store().get_shared(slug).map(Arc::clone)
    }

    /// Rows as `{slug: value}` maps, built on first access
    pub fn rows(&self) -> &[Row] {
        self.rows.get_or_init(|| {
            let store = self.column_store();
            let selected = select_column_store(
                store,
                &self.defs.iter().map(|d| d.slug.clone()).collect::<Vec<_>>(),
            );
            (0..self.num_rows())
                .map(|i| make_row_from_column_store(i, &selected))
                .collect()
        })
    }

    pub fn row_at(&self, index: usize) -> Option<&Row> {
        self.rows().get(index)
    }

    pub fn rows_at(&self, indices: &[usize]) -> Vec<&Row> {
        let rows = self.rows();
        indices.iter().filter_map(|&i| rows.get(i)).collect()
    }

    /// Map from the key of `slugs` (values joined by a space) to row indices
    pub fn row_index(&self, slugs: &[&str]) -> HashMap<String, Vec<usize>> {
        let slugs: Vec<String> = slugs.iter().map(|s| s.to_string()).collect();
        let store = self.column_store();
        let key_fn = make_key_fn(store, &slugs);
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for i in 0..self.num_rows() {
            index.entry(key_fn(i)).or_default().push(i);
        }
        index
    }

    /// The `time` column if present, else the first `Day`, `Date`, `Year`
    /// or `Quarter` column, else the missing-column placeholder.
    pub fn time_column(&self) -> CoreColumn {
        if self.has(TIME_SLUG) {
            return self.get(TIME_SLUG);
        }
        [
            ColumnTypeName::Day,
            ColumnTypeName::Date,
            ColumnTypeName::Year,
            ColumnTypeName::Quarter,
        ]
        .into_iter()
        .find_map(|ty| self.defs.iter().find(|d| d.type_name() == ty))
        .map(|def| self.get(&def.slug))
        .unwrap_or_else(|| CoreColumn::missing(TIME_SLUG))
    }

    pub fn label(&self) -> &str {
        &self.record.label
    }

    pub fn category(&self) -> TransformCategory {
        self.record.category
    }

    pub fn guid(&self) -> u64 {
        self.record.guid
    }

    pub fn provenance(&self) -> &Arc<ProvenanceRecord> {
        &self.record
    }
}

/// Keep the last definition for each slug, at the position of the first
pub(crate) fn dedupe_defs(defs: Vec<ColumnDef>) -> Vec<ColumnDef> {
    let mut out: Vec<ColumnDef> = Vec::with_capacity(defs.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for def in defs {
        match index.get(&def.slug) {
            Some(&i) => out[i] = def,
            None => {
                index.insert(def.slug.clone(), out.len());
                out.push(def);
            }
        }
    }
    out
}

/// Parse a column when its first non-error value is not in parsed form.
/// Error values are already final, so they say nothing about the rest.
pub(crate) fn parse_if_needed(def: &ColumnDef, values: &ColumnValues) -> Option<ColumnValues> {
    if def.skip_parsing {
        return None;
    }
    let ty = column_type(def.type_name());
    let sample = values.iter().find(|v| !v.is_error())?;
    if !ty.needs_parsing(sample) {
        return None;
    }
    Some(Arc::new(values.iter().map(|v| ty.parse(v)).collect()))
}

/// Parse every value of a column regardless of the first row
pub(crate) fn parse_all(def: &ColumnDef, values: &[CellValue]) -> Vec<CellValue> {
    if def.skip_parsing {
        return values.to_vec();
    }
    let ty = column_type(def.type_name());
    values
        .iter()
        .map(|v| if ty.needs_parsing(v) { ty.parse(v) } else { v.clone() })
        .collect()
}
