//! Engine-wide constants.
//!
//! Centralizes well-known slugs and default values so the table code and its
//! tests agree on them.

// ============================================================================
// Well-known Slugs
// ============================================================================

/// Literal time column, preferred over any type-inferred temporal column
pub const TIME_SLUG: &str = "time";

pub const DAY_SLUG: &str = "day";

pub const DATE_SLUG: &str = "date";

pub const YEAR_SLUG: &str = "year";

pub const QUARTER_SLUG: &str = "quarter";

pub const ENTITY_NAME_SLUG: &str = "entityName";

pub const ENTITY_CODE_SLUG: &str = "entityCode";

pub const ENTITY_ID_SLUG: &str = "entityId";

/// Suffix of the column holding the original observation time of a variable
pub const ORIGINAL_TIME_SUFFIX: &str = "-originalTime";

// ============================================================================
// Time
// ============================================================================

/// Day zero for `Day` and `Date` columns, as (year, month, day)
pub const ZERO_DAY: (i32, u32, u32) = (2020, 1, 21);

// ============================================================================
// Defaults
// ============================================================================

/// Rows sampled when guessing a delimited column's type
pub const DEFAULT_AUTOTYPE_SAMPLE_SIZE: usize = 100;

/// Operations slower than this are logged as warnings
pub const DEFAULT_SLOW_OPERATION_MS: f64 = 50.0;

/// Rows printed by `dump` unless told otherwise
pub const DEFAULT_DUMP_ROW_LIMIT: usize = 30;

/// Decimal places for numeric display formatting
pub const DEFAULT_NUM_DECIMAL_PLACES: usize = 2;

/// Separator between values in row keys built by `make_key_fn`
pub const KEY_SEPARATOR: &str = " ";
