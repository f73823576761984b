//! Ancestry records and diagnostics.
//!
//! A derived table links to the record of its parent, never to the parent
//! table itself, so ancestors' column stores are released as soon as nothing
//! else holds them.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::CoreTable;
use crate::types::TransformCategory;

static NEXT_GUID: AtomicU64 = AtomicU64::new(1);

fn next_guid() -> u64 {
    NEXT_GUID.fetch_add(1, Ordering::Relaxed)
}

/// What one table in a derivation chain looked like
#[derive(Clone, Debug, Serialize)]
pub struct ProvenanceRecord {
    /// Process-wide, increases along every chain
    pub guid: u64,
    pub label: String,
    pub category: TransformCategory,
    pub num_rows: usize,
    pub column_slugs: Vec<String>,
    #[serde(skip)]
    pub parent: Option<Arc<ProvenanceRecord>>,
}

impl ProvenanceRecord {
    pub(crate) fn new(
        label: String,
        category: TransformCategory,
        num_rows: usize,
        column_slugs: Vec<String>,
        parent: Option<Arc<ProvenanceRecord>>,
    ) -> Self {
        Self {
            guid: next_guid(),
            label,
            category,
            num_rows,
            column_slugs,
            parent,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.column_slugs.len()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn describe(&self, step: usize) -> String {
        let mut line = format!(
            "{}. {} `{}`: {} rows, {} columns (guid {})",
            step,
            self.category,
            self.label,
            self.num_rows,
            self.num_columns(),
            self.guid
        );
        if let Some(parent) = &self.parent {
            let before: HashSet<&str> = parent.column_slugs.iter().map(String::as_str).collect();
            let after: HashSet<&str> = self.column_slugs.iter().map(String::as_str).collect();
            let added: Vec<&str> = self
                .column_slugs
                .iter()
                .map(String::as_str)
                .filter(|s| !before.contains(s))
                .collect();
            let removed: Vec<&str> = parent
                .column_slugs
                .iter()
                .map(String::as_str)
                .filter(|s| !after.contains(s))
                .collect();
            if !added.is_empty() {
                line.push_str(&format!(" +[{}]", added.join(", ")));
            }
            if !removed.is_empty() {
                line.push_str(&format!(" -[{}]", removed.join(", ")));
            }
            if parent.num_rows != self.num_rows {
                line.push_str(&format!(
                    " rows {:+}",
                    self.num_rows as i64 - parent.num_rows as i64
                ));
            }
        }
        line
    }
}

impl CoreTable {
    /// Provenance records from the root to this table, inclusive
    pub fn ancestors(&self) -> Vec<Arc<ProvenanceRecord>> {
        let mut chain = Vec::new();
        let mut current = Some(Arc::clone(&self.record));
        while let Some(record) = current {
            current = record.parent.clone();
            chain.push(record);
        }
        chain.reverse();
        chain
    }

    /// Number of derivation steps from the root
    pub fn generation(&self) -> usize {
        self.ancestors().len() - 1
    }

    /// One line per step of the derivation chain
    pub fn explain(&self) -> String {
        self.ancestors()
            .iter()
            .enumerate()
            .map(|(i, record)| record.describe(i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One line per column: slug, type, valid and error counts, transform
    pub fn explain_columns(&self) -> String {
        let mut lines = vec!["slug\ttype\tvalid\terrors\ttransform".to_string()];
        for def in &self.defs {
            let column = self.get(&def.slug);
            lines.push(format!(
                "{}\t{}\t{}\t{}\t{}",
                def.slug,
                def.type_name(),
                column.num_valid_values(),
                column.num_error_values(),
                def.transform.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }

    /// Tab-separated preview of the first rows. Error values show their name.
    pub fn dump(&self, row_limit: Option<usize>) -> String {
        let limit = row_limit.unwrap_or(self.config.dump_row_limit);
        let slugs = self.column_slugs();
        let store = self.column_store();

        let mut lines = vec![slugs.join("\t")];
        for i in 0..self.num_rows().min(limit) {
            let cells: Vec<String> = slugs
                .iter()
                .map(|slug| {
                    store
                        .get(slug)
                        .and_then(|values| values.get(i))
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                })
                .collect();
            lines.push(cells.join("\t"));
        }
        if self.num_rows() > limit {
            lines.push(format!("... {} more rows", self.num_rows() - limit));
        }
        lines.join("\n")
    }

    /// Cells across all defined columns that hold real data
    pub fn num_valid_cells(&self) -> usize {
        self.defs
            .iter()
            .map(|def| self.get(&def.slug).num_valid_values())
            .sum()
    }

    pub fn num_error_values(&self) -> usize {
        self.defs
            .iter()
            .map(|def| self.get(&def.slug).num_error_values())
            .sum()
    }
}
