//! Error-value sentinels.
//!
//! A closed set of distinguished non-values that flow through column data in
//! place of real cells. Each variant is its own identity: two different
//! sentinels never compare equal, and no sentinel equals real data.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::CellValue;

/// Why a cell holds no meaningful value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorValue {
    /// Row had no value for this column
    MissingValuePlaceholder,
    /// Removed on purpose by `replace_random_cells`
    DroppedForTesting,
    /// Zero or negative value in a column rendered on a log scale
    InvalidOnALogScale,
    NaNButShouldBeNumber,
    InvalidNegativeValue,
    NullButShouldBeNumber,
    UndefinedButShouldBeNumber,
    BlankOrUndefinedButShouldBeNumber,
    UndefinedButShouldBeString,
    NullButShouldBeString,
    NotAParseableNumberButShouldBeNumber,
    DivideByZeroError,
    NoValueWithinTolerance,
    NoMatchingValueAfterJoin,
    /// Time series has not yet crossed its threshold
    ValueTooLow,
    NoValueToCompareAgainst,
    FilteredValue,
    NoValueForInterpolation,
    InvalidQuarterValue,
    InvalidBooleanValue,
}

impl ErrorValue {
    /// Every sentinel, in declaration order.
    pub const ALL: [ErrorValue; 20] = [
        ErrorValue::MissingValuePlaceholder,
        ErrorValue::DroppedForTesting,
        ErrorValue::InvalidOnALogScale,
        ErrorValue::NaNButShouldBeNumber,
        ErrorValue::InvalidNegativeValue,
        ErrorValue::NullButShouldBeNumber,
        ErrorValue::UndefinedButShouldBeNumber,
        ErrorValue::BlankOrUndefinedButShouldBeNumber,
        ErrorValue::UndefinedButShouldBeString,
        ErrorValue::NullButShouldBeString,
        ErrorValue::NotAParseableNumberButShouldBeNumber,
        ErrorValue::DivideByZeroError,
        ErrorValue::NoValueWithinTolerance,
        ErrorValue::NoMatchingValueAfterJoin,
        ErrorValue::ValueTooLow,
        ErrorValue::NoValueToCompareAgainst,
        ErrorValue::FilteredValue,
        ErrorValue::NoValueForInterpolation,
        ErrorValue::InvalidQuarterValue,
        ErrorValue::InvalidBooleanValue,
    ];

    /// Programmatic name, used in diagnostics and typed matrices.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorValue::MissingValuePlaceholder => "MissingValuePlaceholder",
            ErrorValue::DroppedForTesting => "DroppedForTesting",
            ErrorValue::InvalidOnALogScale => "InvalidOnALogScale",
            ErrorValue::NaNButShouldBeNumber => "NaNButShouldBeNumber",
            ErrorValue::InvalidNegativeValue => "InvalidNegativeValue",
            ErrorValue::NullButShouldBeNumber => "NullButShouldBeNumber",
            ErrorValue::UndefinedButShouldBeNumber => "UndefinedButShouldBeNumber",
            ErrorValue::BlankOrUndefinedButShouldBeNumber => "BlankOrUndefinedButShouldBeNumber",
            ErrorValue::UndefinedButShouldBeString => "UndefinedButShouldBeString",
            ErrorValue::NullButShouldBeString => "NullButShouldBeString",
            ErrorValue::NotAParseableNumberButShouldBeNumber => {
                "NotAParseableNumberButShouldBeNumber"
            }
            ErrorValue::DivideByZeroError => "DivideByZeroError",
            ErrorValue::NoValueWithinTolerance => "NoValueWithinTolerance",
            ErrorValue::NoMatchingValueAfterJoin => "NoMatchingValueAfterJoin",
            ErrorValue::ValueTooLow => "ValueTooLow",
            ErrorValue::NoValueToCompareAgainst => "NoValueToCompareAgainst",
            ErrorValue::FilteredValue => "FilteredValue",
            ErrorValue::NoValueForInterpolation => "NoValueForInterpolation",
            ErrorValue::InvalidQuarterValue => "InvalidQuarterValue",
            ErrorValue::InvalidBooleanValue => "InvalidBooleanValue",
        }
    }

    /// Inverse of [`ErrorValue::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True iff `value` is real data rather than one of the sentinels.
#[inline]
pub fn is_not_error_value(value: &CellValue) -> bool {
    !matches!(value, CellValue::Error(_))
}
