//! CoreTable: an immutable, lazily materialized columnar table engine.
//!
//! Tables are built from delimited text, rows, matrices or column stores
//! plus [`ColumnDef`]s. Every operation returns a new table that shares the
//! columns it did not change. Bad data never fails an operation; it shows up
//! as an [`ErrorValue`] in the affected cells.
//!
//! ```ignore
//! use coretable::CoreTable;
//!
//! let table = CoreTable::new("country,year,pop\nUSA,2000,10\nFRA,2001,5\n", vec![])?;
//! let completed = table.complete(&["country", "year"])?;
//! println!("{}", completed.to_csv());
//! ```

pub mod column;
pub mod column_types;
pub mod config;
pub mod constants;
pub mod delimited;
pub mod error;
pub mod error_values;
pub mod filter_mask;
pub mod logging;
pub mod perf;
pub mod table;
pub mod table_utils;
pub mod transforms;
pub mod types;

pub use column::CoreColumn;
pub use column_types::{ColumnType, ColumnTypeName, column_type};
pub use config::EngineConfig;
pub use error::{TableError, TableResult};
pub use error_values::{ErrorValue, is_not_error_value};
pub use filter_mask::FilterMask;
pub use table::{CoreTable, ProvenanceRecord, TableOptions, TimedValue};
pub use transforms::ColumnTransform;
pub use types::{
    CellValue, ColumnDef, ColumnDefPatch, ColumnDisplay, ColumnStore, ColumnValues, InputType,
    MISSING, Row, SortOrder, TableInput, TransformCategory,
};
