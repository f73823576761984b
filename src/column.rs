//! Read-only view over one column of a table.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::column_types::{ColumnType, ColumnTypeName, column_type};
use crate::error_values::ErrorValue;
use crate::types::{CellKey, CellValue, ColumnDef, ColumnValues};

/// One column: its definition plus its (shared) parsed values.
///
/// Asking a table for a slug it does not have yields a *missing* column with
/// no values, so callers never have to handle a lookup failure.
#[derive(Clone, Debug)]
pub struct CoreColumn {
    def: ColumnDef,
    values: ColumnValues,
    is_missing: bool,
}

impl CoreColumn {
    pub(crate) fn new(def: ColumnDef, values: ColumnValues) -> Self {
        Self {
            def,
            values,
            is_missing: false,
        }
    }

    /// Placeholder for a slug the table does not have
    pub(crate) fn missing(slug: &str) -> Self {
        Self {
            def: ColumnDef::new(slug),
            values: Arc::new(Vec::new()),
            is_missing: true,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.is_missing
    }

    pub fn slug(&self) -> &str {
        &self.def.slug
    }

    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    /// Display name, falling back to the slug
    pub fn name(&self) -> &str {
        self.def.non_empty_name()
    }

    pub fn type_name(&self) -> ColumnTypeName {
        self.def.type_name()
    }

    pub fn column_type(&self) -> &'static dyn ColumnType {
        column_type(self.type_name())
    }

    pub fn unit(&self) -> Option<&str> {
        self.def.display.unit.as_deref()
    }

    pub fn short_unit(&self) -> Option<&str> {
        self.def.display.short_unit.as_deref()
    }

    pub fn tolerance(&self) -> f64 {
        self.def.tolerance.unwrap_or(0.0)
    }

    pub fn values_including_error_values(&self) -> &[CellValue] {
        &self.values
    }

    /// Shared handle to the values, for identity checks
    pub fn shared_values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values that are real data, in row order
    pub fn valid_values(&self) -> Vec<&CellValue> {
        self.values.iter().filter(|v| !v.is_error()).collect()
    }

    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(CellValue::as_number).collect()
    }

    /// Row indices holding real data
    pub fn valid_indices(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| (!v.is_error()).then_some(i))
            .collect()
    }

    pub fn num_valid_values(&self) -> usize {
        self.values.iter().filter(|v| !v.is_error()).count()
    }

    pub fn num_error_values(&self) -> usize {
        self.values.iter().filter(|v| v.is_error()).count()
    }

    /// How often each sentinel occurs
    pub fn error_value_counts(&self) -> BTreeMap<ErrorValue, usize> {
        let mut counts = BTreeMap::new();
        for err in self.values.iter().filter_map(CellValue::error) {
            *counts.entry(err).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct real values in first-seen order
    pub fn unique_values(&self) -> Vec<&CellValue> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| !v.is_error() && seen.insert(CellKey(*v)))
            .collect()
    }

    pub fn sorted_unique_values(&self) -> Vec<&CellValue> {
        let mut values = self.unique_values();
        values.sort_by(|a, b| a.sort_cmp(b));
        values
    }

    /// Map each distinct value to the rows holding it
    pub fn value_to_indices(&self) -> HashMap<CellKey<'_>, Vec<usize>> {
        let mut index: HashMap<CellKey<'_>, Vec<usize>> = HashMap::new();
        for (i, value) in self.values.iter().enumerate() {
            index.entry(CellKey(value)).or_default().push(i);
        }
        index
    }

    pub fn min_value(&self) -> Option<&CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_error())
            .min_by(|a, b| a.sort_cmp(b))
    }

    pub fn max_value(&self) -> Option<&CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_error())
            .max_by(|a, b| a.sort_cmp(b))
    }

    pub fn sum(&self) -> f64 {
        self.numeric_values().iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        let numbers = self.numeric_values();
        (!numbers.is_empty()).then(|| numbers.iter().sum::<f64>() / numbers.len() as f64)
    }

    pub fn format_value(&self, value: &CellValue) -> String {
        self.column_type().format_value(value, &self.def.display)
    }

    pub fn format_for_csv(&self, value: &CellValue) -> String {
        self.column_type().format_for_csv(value)
    }

    pub fn formatted_values(&self) -> Vec<String> {
        self.values.iter().map(|v| self.format_value(v)).collect()
    }
}
