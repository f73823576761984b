//! Delimited text and matrix output.

use super::CoreTable;
use crate::delimited::join_record;
use crate::types::CellValue;

impl CoreTable {
    /// CSV with a header of display names (or short names when asked).
    /// Error values render as empty fields.
    pub fn to_csv_with_column_names(&self, use_short_names: bool) -> String {
        let header: Vec<&str> = self
            .defs
            .iter()
            .map(|def| match (use_short_names, def.short_name.as_deref()) {
                (true, Some(short)) if !short.is_empty() => short,
                _ => def.non_empty_name(),
            })
            .collect();
        let slugs = self.column_slugs();
        self.write_delimited(',', header, &slugs, None)
    }

    /// Delimited text headed by slugs. `slugs` restricts and orders the
    /// columns; `row_limit` caps the body.
    pub fn to_delimited(
        &self,
        delimiter: char,
        slugs: Option<&[&str]>,
        row_limit: Option<usize>,
    ) -> String {
        let slugs: Vec<&str> = match slugs {
            Some(slugs) => slugs.iter().copied().filter(|s| self.has(s)).collect(),
            None => self.column_slugs(),
        };
        self.write_delimited(delimiter, slugs.clone(), &slugs, row_limit)
    }

    pub fn to_csv(&self) -> String {
        self.to_delimited(',', None, None)
    }

    pub fn to_tsv(&self) -> String {
        self.to_delimited('\t', None, None)
    }

    fn write_delimited(
        &self,
        delimiter: char,
        header: Vec<&str>,
        slugs: &[&str],
        row_limit: Option<usize>,
    ) -> String {
        let columns: Vec<_> = slugs.iter().map(|slug| self.get(slug)).collect();
        let num_rows = row_limit.map_or(self.num_rows(), |limit| limit.min(self.num_rows()));

        let mut lines = Vec::with_capacity(num_rows + 1);
        lines.push(join_record(&header, delimiter));
        for i in 0..num_rows {
            let fields: Vec<String> = columns
                .iter()
                .map(|column| {
                    column
                        .values_including_error_values()
                        .get(i)
                        .map(|value| column.format_for_csv(value))
                        .unwrap_or_default()
                })
                .collect();
            lines.push(join_record(&fields, delimiter));
        }
        lines.join("\n")
    }

    /// Header row of slugs followed by one row per record; error values
    /// become `None`
    pub fn to_matrix(&self) -> Vec<Vec<Option<CellValue>>> {
        self.to_typed_matrix()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| (!value.is_error()).then_some(value))
                    .collect()
            })
            .collect()
    }

    /// Like [`to_matrix`](Self::to_matrix) but keeps error values
    pub fn to_typed_matrix(&self) -> Vec<Vec<CellValue>> {
        let slugs = self.column_slugs();
        let store = self.column_store();
        let mut matrix = Vec::with_capacity(self.num_rows() + 1);
        matrix.push(slugs.iter().map(|s| CellValue::from(*s)).collect());
        for i in 0..self.num_rows() {
            matrix.push(
                slugs
                    .iter()
                    .map(|slug| {
                        store
                            .get(slug)
                            .and_then(|values| values.get(i))
                            .cloned()
                            .unwrap_or(crate::types::MISSING)
                    })
                    .collect(),
            );
        }
        matrix
    }
}
