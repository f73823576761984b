//! Column type registry.
//!
//! Every semantic column type knows how to parse a raw cell into a typed one,
//! whether a cell still needs parsing, and how to format values for display
//! and for CSV. Types are a closed enum ([`ColumnTypeName`]); behavior lives
//! in one [`ColumnType`] implementation per family, registered in a static map
//! keyed by the enum.
//!
//! Parsing never fails: a value that cannot be parsed becomes an
//! [`ErrorValue`] sentinel, and sentinels pass through every parser
//! unchanged, so `parse(parse(x)) == parse(x)` for every type.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::constants::{DEFAULT_NUM_DECIMAL_PLACES, ZERO_DAY};
use crate::error_values::ErrorValue;
use crate::types::{CellValue, ColumnDisplay, format_plain_number};

/// Semantic column types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnTypeName {
    #[default]
    String,
    SeriesAnnotation,
    Categorical,
    Region,
    Continent,
    Color,
    EntityName,
    EntityId,
    EntityCode,
    Boolean,
    Numeric,
    NumericCategorical,
    Integer,
    Currency,
    Percentage,
    DecimalPercentage,
    RelativePercentage,
    PercentChangeOverTime,
    Ratio,
    Population,
    PopulationChange,
    Age,
    Ordinal,
    Year,
    Day,
    Date,
    Quarter,
}

impl ColumnTypeName {
    pub const ALL: [ColumnTypeName; 27] = [
        ColumnTypeName::String,
        ColumnTypeName::SeriesAnnotation,
        ColumnTypeName::Categorical,
        ColumnTypeName::Region,
        ColumnTypeName::Continent,
        ColumnTypeName::Color,
        ColumnTypeName::EntityName,
        ColumnTypeName::EntityId,
        ColumnTypeName::EntityCode,
        ColumnTypeName::Boolean,
        ColumnTypeName::Numeric,
        ColumnTypeName::NumericCategorical,
        ColumnTypeName::Integer,
        ColumnTypeName::Currency,
        ColumnTypeName::Percentage,
        ColumnTypeName::DecimalPercentage,
        ColumnTypeName::RelativePercentage,
        ColumnTypeName::PercentChangeOverTime,
        ColumnTypeName::Ratio,
        ColumnTypeName::Population,
        ColumnTypeName::PopulationChange,
        ColumnTypeName::Age,
        ColumnTypeName::Ordinal,
        ColumnTypeName::Year,
        ColumnTypeName::Day,
        ColumnTypeName::Date,
        ColumnTypeName::Quarter,
    ];
}

impl fmt::Display for ColumnTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Primitive kind of a column's parsed values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
}

/// Parse/format behavior of one semantic type
pub trait ColumnType: Send + Sync {
    fn name(&self) -> ColumnTypeName;

    fn value_kind(&self) -> ValueKind;

    /// Year, Day, Date and Quarter columns
    fn is_temporal(&self) -> bool {
        false
    }

    /// False when `value` is already in this type's parsed form
    fn needs_parsing(&self, value: &CellValue) -> bool;

    fn parse(&self, value: &CellValue) -> CellValue;

    /// Human-readable rendering. Error values render as an empty string.
    fn format_value(&self, value: &CellValue, display: &ColumnDisplay) -> String;

    /// Rendering for CSV cells, before escaping. Error values render empty.
    fn format_for_csv(&self, value: &CellValue) -> String;
}

// ============================================================================
// Registry
// ============================================================================

static STRING_TYPE: StringType = StringType {
    name: ColumnTypeName::String,
};

static REGISTRY: Lazy<HashMap<ColumnTypeName, Box<dyn ColumnType>>> = Lazy::new(|| {
    ColumnTypeName::ALL
        .iter()
        .map(|&name| (name, build_column_type(name)))
        .collect()
});

fn build_column_type(name: ColumnTypeName) -> Box<dyn ColumnType> {
    use ColumnTypeName as T;
    match name {
        T::String
        | T::SeriesAnnotation
        | T::Categorical
        | T::Region
        | T::Continent
        | T::Color
        | T::EntityName
        | T::EntityId
        | T::EntityCode => Box::new(StringType { name }),
        T::Boolean => Box::new(BooleanType),
        T::Numeric | T::NumericCategorical | T::Ordinal | T::PopulationChange => {
            Box::new(NumericType::new(name, NumberStyle::Plain))
        }
        T::Integer => Box::new(NumericType::new(name, NumberStyle::Integer)),
        T::Population => Box::new(NumericType::new(name, NumberStyle::Integer)),
        T::Currency => Box::new(NumericType::new(name, NumberStyle::Currency)),
        T::Percentage => Box::new(NumericType::new(name, NumberStyle::Percentage)),
        T::DecimalPercentage => Box::new(NumericType::new(name, NumberStyle::DecimalPercentage)),
        T::RelativePercentage | T::PercentChangeOverTime => {
            Box::new(NumericType::new(name, NumberStyle::SignedPercentage))
        }
        T::Ratio => Box::new(NumericType::new(name, NumberStyle::Plain)),
        T::Age => Box::new(NumericType::new(name, NumberStyle::Age)),
        T::Year => Box::new(YearType),
        T::Day | T::Date => Box::new(DayType { name }),
        T::Quarter => Box::new(QuarterType),
    }
}

/// Look up the behavior registered for `name`
pub fn column_type(name: ColumnTypeName) -> &'static dyn ColumnType {
    REGISTRY
        .get(&name)
        .map(|t| t.as_ref())
        .unwrap_or(&STRING_TYPE as &dyn ColumnType)
}

// ============================================================================
// Time conversions
// ============================================================================

fn zero_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(ZERO_DAY.0, ZERO_DAY.1, ZERO_DAY.2).unwrap_or(NaiveDate::MIN)
}

/// Days between `date` and the zero day
pub fn date_to_day(date: NaiveDate) -> i64 {
    date.signed_duration_since(zero_day()).num_days()
}

/// Calendar date of a day offset
pub fn day_to_date(day: i64) -> Option<NaiveDate> {
    zero_day().checked_add_signed(chrono::Duration::try_days(day)?)
}

/// Parse a strict `YYYY-MM-DD` date into a day offset
pub fn parse_iso_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.len() != 10 || text.as_bytes()[4] != b'-' || text.as_bytes()[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(date_to_day)
}

/// `YYYY-MM-DD` rendering of a day offset
pub fn format_day_iso(day: i64) -> String {
    day_to_date(day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| day.to_string())
}

/// Integer time of a quarter: `year * 4 + (quarter - 1)`
pub fn quarter_to_time(year: i64, quarter: u32) -> i64 {
    year * 4 + i64::from(quarter) - 1
}

/// Inverse of [`quarter_to_time`]
pub fn time_to_quarter(time: i64) -> (i64, u32) {
    (time.div_euclid(4), time.rem_euclid(4) as u32 + 1)
}

/// Parse `YYYY-Qn`
pub fn parse_quarter(text: &str) -> Option<i64> {
    let (year, quarter) = text.trim().split_once("-Q")?;
    let year: i64 = year.parse().ok()?;
    let quarter: u32 = quarter.parse().ok()?;
    (1..=4)
        .contains(&quarter)
        .then(|| quarter_to_time(year, quarter))
}

// ============================================================================
// Number formatting
// ============================================================================

/// Round to `decimals`, insert thousands separators, trim trailing zeros.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return format!("{}", n);
    }
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if n < 0.0 && !is_zero { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

fn with_short_unit(formatted: String, display: &ColumnDisplay) -> String {
    match display.short_unit.as_deref() {
        None | Some("") => formatted,
        Some("%") => format!("{}%", formatted),
        Some(prefix @ ("$" | "£" | "€")) => match formatted.strip_prefix('-') {
            Some(abs) => format!("-{}{}", prefix, abs),
            None => format!("{}{}", prefix, formatted),
        },
        Some(unit) => format!("{} {}", formatted, unit),
    }
}

fn parse_number_text(text: &str) -> CellValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return CellValue::Error(ErrorValue::BlankOrUndefinedButShouldBeNumber);
    }
    let cleaned: String = trimmed.chars().filter(|&c| c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        Ok(n) if n.is_nan() => CellValue::Error(ErrorValue::NaNButShouldBeNumber),
        _ => CellValue::Error(ErrorValue::NotAParseableNumberButShouldBeNumber),
    }
}

/// Shared numeric parse used by every number-valued type
fn parse_numeric(value: &CellValue, truncate: bool) -> CellValue {
    let parsed = match value {
        CellValue::Number(n) if n.is_nan() => {
            return CellValue::Error(ErrorValue::NaNButShouldBeNumber);
        }
        CellValue::Number(n) => CellValue::Number(*n),
        CellValue::Text(s) => parse_number_text(s),
        CellValue::Boolean(_) => CellValue::Error(ErrorValue::NaNButShouldBeNumber),
        CellValue::Null => CellValue::Error(ErrorValue::NullButShouldBeNumber),
        CellValue::Error(e) => CellValue::Error(*e),
    };
    match parsed {
        CellValue::Number(n) if truncate => CellValue::Number(n.trunc()),
        other => other,
    }
}

fn numeric_needs_parsing(value: &CellValue, integral: bool) -> bool {
    match value {
        CellValue::Number(n) => n.is_nan() || (integral && n.is_finite() && n.fract() != 0.0),
        CellValue::Error(_) => false,
        _ => true,
    }
}

// ============================================================================
// Implementations
// ============================================================================

/// Text-valued types (strings, categories, entity names, colors)
#[derive(Debug)]
struct StringType {
    name: ColumnTypeName,
}

impl ColumnType for StringType {
    fn name(&self) -> ColumnTypeName {
        self.name
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        !matches!(value, CellValue::Text(_) | CellValue::Error(_))
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        match value {
            CellValue::Text(_) | CellValue::Error(_) => value.clone(),
            CellValue::Null => CellValue::Error(ErrorValue::NullButShouldBeString),
            other => CellValue::Text(other.to_string()),
        }
    }

    fn format_value(&self, value: &CellValue, _display: &ColumnDisplay) -> String {
        self.format_for_csv(value)
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Error(_) | CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug)]
struct BooleanType;

impl ColumnType for BooleanType {
    fn name(&self) -> ColumnTypeName {
        ColumnTypeName::Boolean
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        !matches!(value, CellValue::Boolean(_) | CellValue::Error(_))
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        match value {
            CellValue::Boolean(_) | CellValue::Error(_) => value.clone(),
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => CellValue::Boolean(true),
                "false" | "no" | "n" | "0" => CellValue::Boolean(false),
                _ => CellValue::Error(ErrorValue::InvalidBooleanValue),
            },
            CellValue::Number(n) if *n == 1.0 => CellValue::Boolean(true),
            CellValue::Number(n) if *n == 0.0 => CellValue::Boolean(false),
            _ => CellValue::Error(ErrorValue::InvalidBooleanValue),
        }
    }

    fn format_value(&self, value: &CellValue, _display: &ColumnDisplay) -> String {
        self.format_for_csv(value)
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Boolean(b) => b.to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumberStyle {
    Plain,
    Integer,
    Currency,
    Percentage,
    DecimalPercentage,
    SignedPercentage,
    Age,
}

#[derive(Debug)]
struct NumericType {
    name: ColumnTypeName,
    style: NumberStyle,
}

impl NumericType {
    fn new(name: ColumnTypeName, style: NumberStyle) -> Self {
        Self { name, style }
    }

    fn integral(&self) -> bool {
        self.style == NumberStyle::Integer
    }
}

impl ColumnType for NumericType {
    fn name(&self) -> ColumnTypeName {
        self.name
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Number
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        numeric_needs_parsing(value, self.integral())
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        parse_numeric(value, self.integral())
    }

    fn format_value(&self, value: &CellValue, display: &ColumnDisplay) -> String {
        let CellValue::Number(n) = value else {
            return match value {
                CellValue::Text(s) => s.clone(),
                _ => String::new(),
            };
        };
        let decimals = display.num_decimal_places.unwrap_or(match self.style {
            NumberStyle::Integer | NumberStyle::Age => 0,
            _ => DEFAULT_NUM_DECIMAL_PLACES,
        });
        match self.style {
            NumberStyle::Plain | NumberStyle::Integer => {
                with_short_unit(format_number(*n, decimals), display)
            }
            NumberStyle::Currency => {
                let formatted = format_number(*n, decimals);
                match formatted.strip_prefix('-') {
                    Some(abs) => format!("-${}", abs),
                    None => format!("${}", formatted),
                }
            }
            NumberStyle::Percentage => format!("{}%", format_number(*n, decimals)),
            NumberStyle::DecimalPercentage => format!("{}%", format_number(n * 100.0, decimals)),
            NumberStyle::SignedPercentage => {
                let formatted = format_number(*n, decimals);
                if *n > 0.0 && formatted != "0" {
                    format!("+{}%", formatted)
                } else {
                    format!("{}%", formatted)
                }
            }
            NumberStyle::Age => {
                let formatted = format_number(*n, decimals);
                if formatted == "1" {
                    "1 year".to_string()
                } else {
                    format!("{} years", formatted)
                }
            }
        }
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Text(s) => s.clone(),
            _ => String::new(),
        }
    }
}

#[derive(Debug)]
struct YearType;

impl ColumnType for YearType {
    fn name(&self) -> ColumnTypeName {
        ColumnTypeName::Year
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Number
    }

    fn is_temporal(&self) -> bool {
        true
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        numeric_needs_parsing(value, true)
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        parse_numeric(value, true)
    }

    fn format_value(&self, value: &CellValue, _display: &ColumnDisplay) -> String {
        match value {
            CellValue::Number(n) if *n < 0.0 => format!("{} BCE", format_plain_number(-n)),
            CellValue::Number(n) => format_plain_number(*n),
            _ => String::new(),
        }
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(n) => format_plain_number(*n),
            _ => String::new(),
        }
    }
}

/// Day offsets from the zero day. `Day` renders as `Jan 21, 2020`, `Date`
/// renders ISO.
#[derive(Debug)]
struct DayType {
    name: ColumnTypeName,
}

impl ColumnType for DayType {
    fn name(&self) -> ColumnTypeName {
        self.name
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Number
    }

    fn is_temporal(&self) -> bool {
        true
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        numeric_needs_parsing(value, true)
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        if let CellValue::Text(s) = value {
            if let Some(day) = parse_iso_date(s) {
                return CellValue::Number(day as f64);
            }
        }
        parse_numeric(value, true)
    }

    fn format_value(&self, value: &CellValue, _display: &ColumnDisplay) -> String {
        let CellValue::Number(n) = value else {
            return String::new();
        };
        let day = *n as i64;
        match (self.name, day_to_date(day)) {
            (ColumnTypeName::Day, Some(date)) => {
                format!("{} {}, {}", date.format("%b"), date.day(), date.year())
            }
            _ => format_day_iso(day),
        }
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(n) => format_day_iso(*n as i64),
            _ => String::new(),
        }
    }
}

#[derive(Debug)]
struct QuarterType;

impl ColumnType for QuarterType {
    fn name(&self) -> ColumnTypeName {
        ColumnTypeName::Quarter
    }

    fn value_kind(&self) -> ValueKind {
        ValueKind::Number
    }

    fn is_temporal(&self) -> bool {
        true
    }

    fn needs_parsing(&self, value: &CellValue) -> bool {
        numeric_needs_parsing(value, true)
    }

    fn parse(&self, value: &CellValue) -> CellValue {
        match value {
            CellValue::Number(n) if n.is_finite() => CellValue::Number(n.trunc()),
            CellValue::Text(s) => parse_quarter(s)
                .map(|t| CellValue::Number(t as f64))
                .unwrap_or(CellValue::Error(ErrorValue::InvalidQuarterValue)),
            CellValue::Null => CellValue::Error(ErrorValue::NullButShouldBeNumber),
            CellValue::Error(e) => CellValue::Error(*e),
            _ => CellValue::Error(ErrorValue::InvalidQuarterValue),
        }
    }

    fn format_value(&self, value: &CellValue, _display: &ColumnDisplay) -> String {
        self.format_for_csv(value)
    }

    fn format_for_csv(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(n) => {
                let (year, quarter) = time_to_quarter(*n as i64);
                format!("{}-Q{}", year, quarter)
            }
            _ => String::new(),
        }
    }
}
