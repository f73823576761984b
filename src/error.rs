//! Error types for table construction and transformation
//!
//! Bad or missing *data* never produces an error here: it is encoded in the
//! cells as an [`ErrorValue`](crate::ErrorValue). `TableError` is reserved for
//! mistakes by the caller, such as an unparseable transform expression or a
//! hand-built column store whose columns disagree on length.

use thiserror::Error;

/// Errors that can occur while building or deriving tables
#[derive(Error, Debug)]
pub enum TableError {
    /// A column definition carries a transform that cannot be parsed
    #[error("Invalid transform `{expression}` on column `{slug}`: {reason}")]
    InvalidTransform {
        slug: String,
        expression: String,
        reason: String,
    },

    /// Transforms reference each other in a loop
    #[error("Transform dependency cycle involving column `{slug}`")]
    TransformCycle { slug: String },

    /// Columns of one store disagree on their length
    #[error("Column `{slug}` has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        slug: String,
        expected: usize,
        actual: usize,
    },

    /// `complete` was called with something other than two slugs
    #[error("complete() requires exactly 2 columns, got {got}")]
    CompleteRequiresTwoColumns { got: usize },

    /// Completion produced more rows than the cartesian bound allows
    #[error("Completed table has {rows} rows, more than the maximum of {max}")]
    CompletionOverflow { rows: usize, max: usize },

    /// Input whose shape could not be recognized
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error from std::io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error from serde_json
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for table operations
pub type TableResult<T> = Result<T, TableError>;

impl TableError {
    pub(crate) fn invalid_transform(
        slug: &str,
        expression: &str,
        reason: impl Into<String>,
    ) -> Self {
        TableError::InvalidTransform {
            slug: slug.to_string(),
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
