//! Core value types for the table engine.
//!
//! This module defines the cell representation, the column store every table
//! is built on, column definitions (the schema), and the input shapes a table
//! can be constructed from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::column_types::ColumnTypeName;
use crate::error::{TableError, TableResult};
use crate::error_values::ErrorValue;

// ============================================================================
// Cells
// ============================================================================

/// A single cell value
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Raw `null` from untyped input; parsing turns it into an error value
    Null,
    Error(ErrorValue),
}

/// Shorthand for the "missing" sentinel cell.
pub const MISSING: CellValue = CellValue::Error(ErrorValue::MissingValuePlaceholder);

impl CellValue {
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The sentinel, if this cell holds one
    pub fn error(&self) -> Option<ErrorValue> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert an untyped JSON value into a raw cell.
    ///
    /// Objects of the form `{"error": "<Name>"}` become the named sentinel;
    /// any other nested structure is kept as its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Boolean(*b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Object(obj) => obj
                .get("error")
                .and_then(Value::as_str)
                .and_then(ErrorValue::from_name)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::Text(value.to_string())),
            Value::Array(_) => CellValue::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Boolean(b) => Value::Bool(*b),
            CellValue::Null => Value::Null,
            CellValue::Error(e) => serde_json::json!({ "error": e.name() }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Number(_) => 0,
            CellValue::Text(_) => 1,
            CellValue::Boolean(_) => 2,
            CellValue::Null => 3,
            CellValue::Error(_) => 4,
        }
    }

    /// Total order used for sorting: numbers, then text, then booleans,
    /// then nulls, then error values.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::Error(a), CellValue::Error(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Format a number without a trailing `.0` for whole values
pub(crate) fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => f.write_str(&format_plain_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Null => f.write_str("null"),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<ErrorValue> for CellValue {
    fn from(e: ErrorValue) -> Self {
        CellValue::Error(e)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(CellValue::from_json(&value))
    }
}

/// Hashable view of a cell, used for uniqueness and grouping.
///
/// Numbers hash by bit pattern with `-0.0` folded into `0.0` and every NaN
/// folded into one canonical NaN.
#[derive(Clone, Copy, Debug)]
pub struct CellKey<'a>(pub &'a CellValue);

fn canonical_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

impl PartialEq for CellKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (CellValue::Number(a), CellValue::Number(b)) => canonical_bits(*a) == canonical_bits(*b),
            (a, b) => a == b,
        }
    }
}

impl Eq for CellKey<'_> {}

impl Hash for CellKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.rank().hash(state);
        match self.0 {
            CellValue::Number(n) => canonical_bits(*n).hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Boolean(b) => b.hash(state),
            CellValue::Null => {}
            CellValue::Error(e) => e.hash(state),
        }
    }
}

// ============================================================================
// Rows and column stores
// ============================================================================

/// A synthetic row view: slug -> value
pub type Row = BTreeMap<String, CellValue>;

/// Values of one column, shared between stores that did not change it
pub type ColumnValues = Arc<Vec<CellValue>>;

/// Ordered mapping from column slug to equal-length value sequences.
///
/// A store is only mutable while owned by the code building it. Tables hold
/// their store behind an `Arc` and never mutate it, so an unchanged column can
/// be shared by every descendant without copying.
#[derive(Clone, Debug, Default)]
pub struct ColumnStore {
    slugs: Vec<String>,
    columns: HashMap<String, ColumnValues>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(slug, values)` pairs, rejecting unequal lengths.
    pub fn from_columns<I, S>(columns: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<CellValue>)>,
        S: Into<String>,
    {
        let mut store = Self::new();
        for (slug, values) in columns {
            store.insert(slug, values);
        }
        store.validate()?;
        Ok(store)
    }

    /// Row count. A store without columns has no rows.
    pub fn num_rows(&self) -> usize {
        self.slugs
            .first()
            .and_then(|slug| self.columns.get(slug))
            .map(|values| values.len())
            .unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    pub fn has(&self, slug: &str) -> bool {
        self.columns.contains_key(slug)
    }

    pub fn get(&self, slug: &str) -> Option<&[CellValue]> {
        self.columns.get(slug).map(|values| values.as_slice())
    }

    /// The shared handle of a column, for identity checks and cheap aliasing.
    pub fn get_shared(&self, slug: &str) -> Option<&ColumnValues> {
        self.columns.get(slug)
    }

    /// Columns in slug order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnValues)> + '_ {
        self.slugs
            .iter()
            .filter_map(|slug| self.columns.get(slug).map(|v| (slug.as_str(), v)))
    }

    /// Insert or replace a column. Replacing keeps the column's position.
    pub fn insert(&mut self, slug: impl Into<String>, values: impl Into<ColumnValues>) {
        let slug = slug.into();
        if !self.columns.contains_key(&slug) {
            self.slugs.push(slug.clone());
        }
        self.columns.insert(slug, values.into());
    }

    pub fn remove(&mut self, slug: &str) -> Option<ColumnValues> {
        let removed = self.columns.remove(slug)?;
        self.slugs.retain(|s| s != slug);
        Some(removed)
    }

    /// Check the central invariant: every column has the same length.
    pub fn validate(&self) -> TableResult<()> {
        let expected = self.num_rows();
        for (slug, values) in self.columns() {
            if values.len() != expected {
                return Err(TableError::ColumnLengthMismatch {
                    slug: slug.to_string(),
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }
}

impl PartialEq for ColumnStore {
    fn eq(&self, other: &Self) -> bool {
        self.slugs == other.slugs
            && self
                .columns()
                .zip(other.columns())
                .all(|((_, a), (_, b))| a == b)
    }
}

// ============================================================================
// Column definitions
// ============================================================================

/// Display hints used when formatting values
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_decimal_places: Option<usize>,
}

impl ColumnDisplay {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Column metadata: the schema of one column
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Unique key of the column
    pub slug: String,
    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Compact name, used by short-name CSV headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Semantic type; autodetected when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnTypeName>,
    /// Transform expression, e.g. `"multiplyBy gdp 1000"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub transform_has_run: bool,
    /// Tolerance for time-based matching, in time units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    /// Inline literal values for this column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<CellValue>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_parsing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "ColumnDisplay::is_default")]
    pub display: ColumnDisplay,
}

impl ColumnDef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, column_type: ColumnTypeName) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn with_values(mut self, values: Vec<CellValue>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_display(mut self, display: ColumnDisplay) -> Self {
        self.display = display;
        self
    }

    /// Semantic type, defaulting to `String`
    pub fn type_name(&self) -> ColumnTypeName {
        self.column_type.unwrap_or_default()
    }

    /// Name for headers: the display name, falling back to the slug
    pub fn non_empty_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.slug)
    }
}

/// Overrides applied when duplicating a column under a new slug
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnDefPatch {
    pub slug: String,
    pub name: Option<String>,
    pub column_type: Option<ColumnTypeName>,
    pub display: Option<ColumnDisplay>,
    pub tolerance: Option<f64>,
}

impl ColumnDefPatch {
    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, column_type: ColumnTypeName) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Apply the overrides on top of `def`
    pub(crate) fn apply(self, def: &ColumnDef) -> ColumnDef {
        let mut out = def.clone();
        out.slug = self.slug;
        out.values = None;
        out.transform = None;
        out.transform_has_run = false;
        if let Some(name) = self.name {
            out.name = Some(name);
        }
        if let Some(column_type) = self.column_type {
            out.column_type = Some(column_type);
        }
        if let Some(display) = self.display {
            out.display = display;
        }
        if let Some(tolerance) = self.tolerance {
            out.tolerance = Some(tolerance);
        }
        out
    }
}

// ============================================================================
// Inputs and transform categories
// ============================================================================

/// Shape of the raw input a table was built from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    Delimited,
    RowStore,
    Matrix,
    ColumnStore,
}

/// Raw input accepted by [`CoreTable`](crate::CoreTable)
#[derive(Clone, Debug)]
pub enum TableInput {
    /// Comma/tab/semicolon separated text, first line is the header
    Delimited(String),
    /// Array of `{slug: value}` rows
    Rows(Vec<Row>),
    /// Array of arrays, first row is the header
    Matrix(Vec<Vec<CellValue>>),
    /// Pre-built column store (fastest path)
    ColumnStore(Arc<ColumnStore>),
}

impl TableInput {
    pub fn input_type(&self) -> InputType {
        match self {
            TableInput::Delimited(_) => InputType::Delimited,
            TableInput::Rows(_) => InputType::RowStore,
            TableInput::Matrix(_) => InputType::Matrix,
            TableInput::ColumnStore(_) => InputType::ColumnStore,
        }
    }

    /// Detect the input shape by inspecting an untyped JSON value.
    ///
    /// - string: delimited text
    /// - array of objects: rows
    /// - array of arrays: matrix
    /// - object of arrays: column store
    pub fn from_json(value: Value) -> TableResult<Self> {
        match value {
            Value::String(text) => Ok(TableInput::Delimited(text)),
            Value::Array(items) => {
                if items.is_empty() {
                    return Ok(TableInput::Rows(Vec::new()));
                }
                if items.iter().all(Value::is_object) {
                    let rows = items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|obj| {
                            obj.iter()
                                .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                                .collect::<Row>()
                        })
                        .collect();
                    Ok(TableInput::Rows(rows))
                } else if items.iter().all(Value::is_array) {
                    let matrix = items
                        .iter()
                        .filter_map(Value::as_array)
                        .map(|row| row.iter().map(CellValue::from_json).collect())
                        .collect();
                    Ok(TableInput::Matrix(matrix))
                } else {
                    Err(TableError::InvalidInput(
                        "array elements must be all objects or all arrays".to_string(),
                    ))
                }
            }
            Value::Object(obj) => {
                let mut store = ColumnStore::new();
                for (slug, column) in obj {
                    let Value::Array(values) = column else {
                        return Err(TableError::InvalidInput(format!(
                            "column `{}` must be an array",
                            slug
                        )));
                    };
                    store.insert(slug, values.iter().map(CellValue::from_json).collect::<Vec<_>>());
                }
                store.validate()?;
                Ok(TableInput::ColumnStore(Arc::new(store)))
            }
            _ => Err(TableError::InvalidInput(
                "expected text, an array, or an object of arrays".to_string(),
            )),
        }
    }
}

impl From<&str> for TableInput {
    fn from(text: &str) -> Self {
        TableInput::Delimited(text.to_string())
    }
}

impl From<String> for TableInput {
    fn from(text: String) -> Self {
        TableInput::Delimited(text)
    }
}

impl From<Vec<Row>> for TableInput {
    fn from(rows: Vec<Row>) -> Self {
        TableInput::Rows(rows)
    }
}

impl From<Vec<Vec<CellValue>>> for TableInput {
    fn from(matrix: Vec<Vec<CellValue>>) -> Self {
        TableInput::Matrix(matrix)
    }
}

impl From<ColumnStore> for TableInput {
    fn from(store: ColumnStore) -> Self {
        TableInput::ColumnStore(Arc::new(store))
    }
}

impl From<Arc<ColumnStore>> for TableInput {
    fn from(store: Arc<ColumnStore>) -> Self {
        TableInput::ColumnStore(store)
    }
}

/// Which operation produced a table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformCategory {
    LoadFromDelimited,
    LoadFromRowStore,
    LoadFromMatrix,
    LoadFromColumnStore,
    FilterRows,
    FilterColumns,
    SortRows,
    RenameColumns,
    AppendRows,
    AppendColumns,
    UpdateColumnDefs,
    UpdateRows,
    CombineColumns,
    Concat,
}

impl TransformCategory {
    pub(crate) fn for_input(input_type: InputType) -> Self {
        match input_type {
            InputType::Delimited => TransformCategory::LoadFromDelimited,
            InputType::RowStore => TransformCategory::LoadFromRowStore,
            InputType::Matrix => TransformCategory::LoadFromMatrix,
            InputType::ColumnStore => TransformCategory::LoadFromColumnStore,
        }
    }
}

impl fmt::Display for TransformCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Direction of a sort key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}
