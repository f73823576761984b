//! Declarative column transforms.
//!
//! A column definition may carry a transform expression such as
//! `"multiplyBy gdp 1000"` or `"rollingAverage time entityName cases 7"`.
//! Expressions are parsed when a table is built, so a malformed one fails
//! immediately; they are applied once, when the table's columns are first
//! materialized, in dependency order.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{TableError, TableResult};
use crate::error_values::ErrorValue;
use crate::types::{CellKey, CellValue, ColumnStore, ColumnValues, MISSING};

/// A parsed transform expression
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnTransform {
    /// Share another column's values
    Duplicate { source: String },
    MultiplyBy { source: String, factor: f64 },
    DivideBy { numerator: String, denominator: String },
    Subtract { minuend: String, subtrahend: String },
    /// `100 * numerator / denominator`
    AsPercentageOf { numerator: String, denominator: String },
    /// Mean of the values observed within the last `window` time units,
    /// per entity
    RollingAverage {
        time: String,
        entity: String,
        value: String,
        window: f64,
    },
    /// Percent change against the value `window` time units earlier, per
    /// entity
    PercentChange {
        time: String,
        entity: String,
        value: String,
        window: f64,
    },
    /// Time elapsed since the entity's value first exceeded `threshold`
    TimeSinceEntityExceededThreshold {
        time: String,
        entity: String,
        value: String,
        threshold: f64,
    },
}

fn parse_number_arg(arg: &str) -> Result<f64, String> {
    arg.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("`{}` is not a number", arg))
}

impl FromStr for ColumnTransform {
    type Err = String;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        let Some((&name, args)) = parts.split_first() else {
            return Err("empty transform".to_string());
        };

        let arity = match name {
            "duplicate" => 1,
            "multiplyBy" | "divideBy" | "subtract" | "asPercentageOf" => 2,
            "rollingAverage" | "percentChange" | "timeSinceEntityExceededThreshold" => 4,
            other => return Err(format!("unknown transform `{}`", other)),
        };
        if args.len() != arity {
            return Err(format!(
                "`{}` takes {} arguments, got {}",
                name,
                arity,
                args.len()
            ));
        }

        let s = |i: usize| args[i].to_string();
        Ok(match name {
            "duplicate" => ColumnTransform::Duplicate { source: s(0) },
            "multiplyBy" => ColumnTransform::MultiplyBy {
                source: s(0),
                factor: parse_number_arg(args[1])?,
            },
            "divideBy" => ColumnTransform::DivideBy {
                numerator: s(0),
                denominator: s(1),
            },
            "subtract" => ColumnTransform::Subtract {
                minuend: s(0),
                subtrahend: s(1),
            },
            "asPercentageOf" => ColumnTransform::AsPercentageOf {
                numerator: s(0),
                denominator: s(1),
            },
            "rollingAverage" => ColumnTransform::RollingAverage {
                time: s(0),
                entity: s(1),
                value: s(2),
                window: parse_number_arg(args[3])?,
            },
            "percentChange" => ColumnTransform::PercentChange {
                time: s(0),
                entity: s(1),
                value: s(2),
                window: parse_number_arg(args[3])?,
            },
            _ => ColumnTransform::TimeSinceEntityExceededThreshold {
                time: s(0),
                entity: s(1),
                value: s(2),
                threshold: parse_number_arg(args[3])?,
            },
        })
    }
}

impl fmt::Display for ColumnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTransform::Duplicate { source } => write!(f, "duplicate {}", source),
            ColumnTransform::MultiplyBy { source, factor } => {
                write!(f, "multiplyBy {} {}", source, factor)
            }
            ColumnTransform::DivideBy {
                numerator,
                denominator,
            } => write!(f, "divideBy {} {}", numerator, denominator),
            ColumnTransform::Subtract {
                minuend,
                subtrahend,
            } => write!(f, "subtract {} {}", minuend, subtrahend),
            ColumnTransform::AsPercentageOf {
                numerator,
                denominator,
            } => write!(f, "asPercentageOf {} {}", numerator, denominator),
            ColumnTransform::RollingAverage {
                time,
                entity,
                value,
                window,
            } => write!(f, "rollingAverage {} {} {} {}", time, entity, value, window),
            ColumnTransform::PercentChange {
                time,
                entity,
                value,
                window,
            } => write!(f, "percentChange {} {} {} {}", time, entity, value, window),
            ColumnTransform::TimeSinceEntityExceededThreshold {
                time,
                entity,
                value,
                threshold,
            } => write!(
                f,
                "timeSinceEntityExceededThreshold {} {} {} {}",
                time, entity, value, threshold
            ),
        }
    }
}

impl ColumnTransform {
    /// Parse the transform attached to column `slug`
    pub fn parse_for(slug: &str, expression: &str) -> TableResult<Self> {
        expression
            .parse()
            .map_err(|reason: String| TableError::invalid_transform(slug, expression, reason))
    }

    /// Columns this transform reads
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            ColumnTransform::Duplicate { source } | ColumnTransform::MultiplyBy { source, .. } => {
                vec![source.as_str()]
            }
            ColumnTransform::DivideBy {
                numerator,
                denominator,
            }
            | ColumnTransform::AsPercentageOf {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
            ColumnTransform::Subtract {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            ColumnTransform::RollingAverage {
                time,
                entity,
                value,
                ..
            }
            | ColumnTransform::PercentChange {
                time,
                entity,
                value,
                ..
            }
            | ColumnTransform::TimeSinceEntityExceededThreshold {
                time,
                entity,
                value,
                ..
            } => vec![time.as_str(), entity.as_str(), value.as_str()],
        }
    }

    /// Compute the output column from `store`.
    ///
    /// A missing source column yields a column of placeholders.
    pub fn apply(&self, store: &ColumnStore) -> ColumnValues {
        let num_rows = store.num_rows();
        let missing: Vec<&str> = self
            .dependencies()
            .into_iter()
            .filter(|slug| !store.has(slug))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                transform = %self,
                missing = ?missing,
                "transform references missing columns"
            );
            return Arc::new(vec![MISSING; num_rows]);
        }

        let col = |slug: &str| store.get(slug).unwrap_or(&[]);
        match self {
            ColumnTransform::Duplicate { source } => store
                .get_shared(source)
                .map(Arc::clone)
                .unwrap_or_else(|| Arc::new(vec![MISSING; num_rows])),
            ColumnTransform::MultiplyBy { source, factor } => Arc::new(
                col(source)
                    .iter()
                    .map(|v| unary(v, |n| CellValue::Number(n * factor)))
                    .collect(),
            ),
            ColumnTransform::DivideBy {
                numerator,
                denominator,
            } => Arc::new(binary(col(numerator), col(denominator), |a, b| {
                divide(a, b, 1.0)
            })),
            ColumnTransform::Subtract {
                minuend,
                subtrahend,
            } => Arc::new(binary(col(minuend), col(subtrahend), |a, b| {
                CellValue::Number(a - b)
            })),
            ColumnTransform::AsPercentageOf {
                numerator,
                denominator,
            } => Arc::new(binary(col(numerator), col(denominator), |a, b| {
                divide(a, b, 100.0)
            })),
            ColumnTransform::RollingAverage {
                time,
                entity,
                value,
                window,
            } => Arc::new(rolling_average(col(time), col(entity), col(value), *window)),
            ColumnTransform::PercentChange {
                time,
                entity,
                value,
                window,
            } => Arc::new(percent_change(col(time), col(entity), col(value), *window)),
            ColumnTransform::TimeSinceEntityExceededThreshold {
                time,
                entity,
                value,
                threshold,
            } => Arc::new(time_since_exceeded(
                col(time),
                col(entity),
                col(value),
                *threshold,
            )),
        }
    }
}

fn as_operand(value: &CellValue) -> Result<f64, CellValue> {
    match value {
        CellValue::Number(n) => Ok(*n),
        CellValue::Error(e) => Err(CellValue::Error(*e)),
        _ => Err(CellValue::Error(ErrorValue::NaNButShouldBeNumber)),
    }
}

fn unary(value: &CellValue, f: impl Fn(f64) -> CellValue) -> CellValue {
    match as_operand(value) {
        Ok(n) => f(n),
        Err(err) => err,
    }
}

fn binary(a: &[CellValue], b: &[CellValue], f: impl Fn(f64, f64) -> CellValue) -> Vec<CellValue> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| match (as_operand(x), as_operand(y)) {
            (Ok(x), Ok(y)) => f(x, y),
            (Err(err), _) | (_, Err(err)) => err,
        })
        .collect()
}

fn divide(numerator: f64, denominator: f64, scale: f64) -> CellValue {
    if denominator == 0.0 {
        CellValue::Error(ErrorValue::DivideByZeroError)
    } else {
        CellValue::Number(scale * numerator / denominator)
    }
}

/// Ranges of consecutive rows sharing one entity value
fn entity_runs(entity: &[CellValue]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=entity.len() {
        if i == entity.len() || CellKey(&entity[i]) != CellKey(&entity[start]) {
            if start < i {
                runs.push(start..i);
            }
            start = i;
        }
    }
    runs
}

fn rolling_average(
    time: &[CellValue],
    entity: &[CellValue],
    value: &[CellValue],
    window: f64,
) -> Vec<CellValue> {
    let mut out = vec![MISSING; value.len()];
    for run in entity_runs(entity) {
        for i in run.clone() {
            if value[i].is_error() {
                out[i] = value[i].clone();
                continue;
            }
            let Some(t) = time[i].as_number() else {
                out[i] = CellValue::Error(ErrorValue::NoValueForInterpolation);
                continue;
            };
            let (sum, count) = run
                .clone()
                .filter(|&j| {
                    time[j]
                        .as_number()
                        .map(|tj| tj <= t && tj > t - window)
                        .unwrap_or(false)
                })
                .filter_map(|j| value[j].as_number())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            out[i] = if count == 0 {
                CellValue::Error(ErrorValue::NoValueForInterpolation)
            } else {
                CellValue::Number(sum / count as f64)
            };
        }
    }
    out
}

fn percent_change(
    time: &[CellValue],
    entity: &[CellValue],
    value: &[CellValue],
    window: f64,
) -> Vec<CellValue> {
    let mut out = vec![MISSING; value.len()];
    for run in entity_runs(entity) {
        let by_time: HashMap<u64, usize> = run
            .clone()
            .filter_map(|j| time[j].as_number().map(|t| (t.to_bits(), j)))
            .collect();
        for i in run {
            let current = match as_operand(&value[i]) {
                Ok(n) => n,
                Err(err) => {
                    out[i] = err;
                    continue;
                }
            };
            let earlier = time[i]
                .as_number()
                .and_then(|t| by_time.get(&(t - window).to_bits()))
                .and_then(|&j| value[j].as_number());
            out[i] = match earlier {
                None => CellValue::Error(ErrorValue::NoValueToCompareAgainst),
                Some(previous) if previous == 0.0 => {
                    CellValue::Error(ErrorValue::DivideByZeroError)
                }
                Some(previous) => CellValue::Number(100.0 * (current - previous) / previous),
            };
        }
    }
    out
}

fn time_since_exceeded(
    time: &[CellValue],
    entity: &[CellValue],
    value: &[CellValue],
    threshold: f64,
) -> Vec<CellValue> {
    let mut out = vec![MISSING; value.len()];
    for run in entity_runs(entity) {
        let mut crossed_at: Option<f64> = None;
        for i in run {
            if crossed_at.is_none() {
                if let (Some(v), Some(t)) = (value[i].as_number(), time[i].as_number()) {
                    if v > threshold {
                        crossed_at = Some(t);
                    }
                }
            }
            out[i] = match (crossed_at, time[i].as_number()) {
                (None, _) => CellValue::Error(ErrorValue::ValueTooLow),
                (Some(start), Some(t)) => CellValue::Number(t - start),
                (Some(_), None) => time[i].clone(),
            };
        }
    }
    out
}

// ============================================================================
// Ordering
// ============================================================================

/// Order `(slug, transform)` pairs so every transform runs after the
/// transforms producing its inputs. A transform reading its own slug reads
/// the input column and does not depend on itself.
pub fn order_transforms(
    transforms: Vec<(String, ColumnTransform)>,
) -> TableResult<Vec<(String, ColumnTransform)>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    let index: HashMap<&str, usize> = transforms
        .iter()
        .enumerate()
        .map(|(i, (slug, _))| (slug.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; transforms.len()];
    let mut order: Vec<usize> = Vec::with_capacity(transforms.len());

    fn visit(
        i: usize,
        transforms: &[(String, ColumnTransform)],
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
        order: &mut Vec<usize>,
    ) -> TableResult<()> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                return Err(TableError::TransformCycle {
                    slug: transforms[i].0.clone(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[i] = Mark::Visiting;
        let (slug, transform) = &transforms[i];
        for dep in transform.dependencies() {
            if dep == slug {
                continue;
            }
            if let Some(&j) = index.get(dep) {
                visit(j, transforms, index, marks, order)?;
            }
        }
        marks[i] = Mark::Done;
        order.push(i);
        Ok(())
    }

    for i in 0..transforms.len() {
        visit(i, &transforms, &index, &mut marks, &mut order)?;
    }

    let mut slots: Vec<Option<(String, ColumnTransform)>> =
        transforms.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Run already ordered transforms against `store`, inserting each output
/// under its slug so later transforms can read it. `finish` sees every
/// output before it is stored.
pub fn apply_transforms<F>(
    store: &mut ColumnStore,
    transforms: &[(String, ColumnTransform)],
    mut finish: F,
) where
    F: FnMut(&str, ColumnValues) -> ColumnValues,
{
    for (slug, transform) in transforms {
        crate::profile_scope!("apply transform");
        let values = finish(slug, transform.apply(store));
        store.insert(slug.clone(), values);
    }
}
