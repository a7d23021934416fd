//! Tabular data inspection
//!
//! Column metadata (semantic type, missing/unique counts), row previews,
//! and the shared column statistics used by the advisor, the transform
//! engine, and the feature pipeline.

mod loader;

pub use loader::DataLoader;

use crate::error::{CleansetError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Semantic kind of a column, independent of the physical dtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Categorical,
    Other,
}

/// Per-column descriptive metadata.
///
/// Always recomputed from actual table contents; a `ColumnInfo` list is
/// never carried across a structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub semantic_type: SemanticType,
    pub missing_count: usize,
    pub unique_count: usize,
}

/// Classify a dtype into a semantic kind
pub fn semantic_type(dtype: &DataType) -> SemanticType {
    if dtype.is_primitive_numeric() {
        SemanticType::Numeric
    } else {
        match dtype {
            DataType::String | DataType::Categorical(_, _) => SemanticType::Categorical,
            _ => SemanticType::Other,
        }
    }
}

/// Number of distinct non-null values in a series
pub fn non_null_unique(series: &Series) -> Result<usize> {
    let n = series.n_unique()?;
    // polars counts null as one distinct value
    if series.null_count() > 0 {
        Ok(n.saturating_sub(1))
    } else {
        Ok(n)
    }
}

/// Compute fresh column metadata for every column of a table
pub fn column_info(df: &DataFrame) -> Result<Vec<ColumnInfo>> {
    df.get_columns()
        .iter()
        .map(|col| {
            let series = col.as_materialized_series();
            Ok(ColumnInfo {
                name: series.name().to_string(),
                semantic_type: semantic_type(series.dtype()),
                missing_count: series.null_count(),
                unique_count: non_null_unique(series)?,
            })
        })
        .collect()
}

/// First `n` rows as JSON records; nulls become JSON null
pub fn preview_records(df: &DataFrame, n: usize) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
    let head = df.head(Some(n));
    let mut records = Vec::with_capacity(head.height());

    for row_idx in 0..head.height() {
        let mut record = serde_json::Map::new();
        for col in head.get_columns() {
            let series = col.as_materialized_series();
            let value = series.get(row_idx)?;
            record.insert(series.name().to_string(), any_value_to_json(value));
        }
        records.push(record);
    }

    Ok(records)
}

fn any_value_to_json(value: AnyValue<'_>) -> serde_json::Value {
    use serde_json::Value;
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => serde_json::Number::from_f64(f64::from(v))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(v) => serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

/// Most frequent non-null value of a numeric series; ties break to the
/// smallest value
pub fn numeric_mode(ca: &Float64Chunked) -> Option<f64> {
    let mut values: Vec<f64> = ca.into_iter().flatten().collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut best_value = values[0];
    let mut best_count = 0usize;
    let mut run_value = values[0];
    let mut run_count = 0usize;

    for &v in &values {
        if v == run_value {
            run_count += 1;
        } else {
            run_value = v;
            run_count = 1;
        }
        if run_count > best_count {
            best_count = run_count;
            best_value = run_value;
        }
    }

    Some(best_value)
}

/// Most frequent non-null string; ties break lexicographically
pub fn string_mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    use std::collections::BTreeMap;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.into_iter().flatten() {
        *counts.entry(v).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in &counts {
        if best.map_or(true, |(_, bc)| *count > bc) {
            best = Some((value, *count));
        }
    }
    best.map(|(v, _)| v.to_string())
}

/// Rows remaining after removing duplicates on `subset`; an empty subset
/// compares whole rows. Row order of survivors is preserved.
pub fn dedup(df: &DataFrame, subset: &[String], keep: UniqueKeepStrategy) -> Result<DataFrame> {
    let out = if subset.is_empty() {
        df.unique_stable(None, keep, None)?
    } else {
        df.unique_stable(Some(subset), keep, None)?
    };
    Ok(out)
}

/// Number of rows duplicating an earlier row on `subset` (empty = whole row)
pub fn duplicate_count(df: &DataFrame, subset: &[String]) -> Result<usize> {
    let unique = dedup(df, subset, UniqueKeepStrategy::First)?;
    Ok(df.height() - unique.height())
}

/// IQR fence for a numeric series: `[Q1 - factor*IQR, Q3 + factor*IQR]`.
/// Returns `None` when the column has no non-null values.
pub fn iqr_bounds(ca: &Float64Chunked, factor: f64) -> Result<Option<(f64, f64)>> {
    if ca.len() == ca.null_count() {
        return Ok(None);
    }
    let q1 = ca
        .quantile(0.25, QuantileMethod::Linear)?
        .ok_or_else(|| CleansetError::Data("quantile on empty column".to_string()))?;
    let q3 = ca
        .quantile(0.75, QuantileMethod::Linear)?
        .ok_or_else(|| CleansetError::Data("quantile on empty column".to_string()))?;
    let iqr = q3 - q1;
    Ok(Some((q1 - factor * iqr, q3 + factor * iqr)))
}

/// Canonical string view of any column, used wherever values are treated as
/// categories. Numeric values format without a trailing `.0` so the same
/// column read as Int64 in one file and Float64 in another yields identical
/// category labels.
pub fn canonical_str_values(series: &Series) -> Result<Vec<Option<String>>> {
    if series.dtype().is_primitive_numeric() {
        let ca = series.cast(&DataType::Float64)?;
        let ca = ca.f64()?;
        Ok(ca
            .into_iter()
            .map(|opt| opt.map(canonical_number))
            .collect())
    } else if series.dtype() == &DataType::String {
        let ca = series.str()?;
        Ok(ca
            .into_iter()
            .map(|opt| opt.map(|s| s.to_string()))
            .collect())
    } else {
        let cast = series.cast(&DataType::String)?;
        let ca = cast.str()?;
        Ok(ca
            .into_iter()
            .map(|opt| opt.map(|s| s.to_string()))
            .collect())
    }
}

fn canonical_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
