//! Transform Engine
//!
//! Applies an ordered list of cleaning operations to a table. Each operation
//! observes the output of its predecessor, so quantiles, modes, and category
//! sets are always computed against the current table state. Any failure
//! aborts the whole call; the input table is never modified.

pub mod ops;

pub use ops::{
    CleaningOperation, EncodeMethod, FillMethod, FillValue, KeepStrategy, OutlierAction,
};

use crate::data::{self, ColumnInfo};
use crate::error::{CleansetError, Result};
use polars::prelude::*;
use tracing::debug;

/// Outcome of applying a list of cleaning operations
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: DataFrame,
    pub original_row_count: usize,
    pub new_row_count: usize,
    pub removed_row_count: usize,
    pub new_column_count: usize,
    pub column_count_delta: i64,
    /// Recomputed from the final table, never stale
    pub columns: Vec<ColumnInfo>,
}

/// Serializable summary of a cleaning run, shaped for the response boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct CleaningReport {
    pub success: bool,
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
    pub original_count: usize,
    pub cleaned_count: usize,
    pub removed_count: usize,
    pub column_count: usize,
    pub added_column_count: i64,
    pub columns: Vec<ColumnInfo>,
}

impl CleaningReport {
    pub fn from_result(result: &TransformResult, preview_rows: usize) -> Result<Self> {
        Ok(Self {
            success: true,
            preview: data::preview_records(&result.table, preview_rows)?,
            original_count: result.original_row_count,
            cleaned_count: result.new_row_count,
            removed_count: result.removed_row_count,
            column_count: result.new_column_count,
            added_column_count: result.column_count_delta,
            columns: result.columns.clone(),
        })
    }
}

/// Apply `operations` in order to a copy of `df`
pub fn apply(df: &DataFrame, operations: &[CleaningOperation]) -> Result<TransformResult> {
    let original_row_count = df.height();
    let original_column_count = df.width();

    let mut current = df.clone();
    for (index, op) in operations.iter().enumerate() {
        current = apply_one(&current, op).map_err(|e| match e {
            CleansetError::ColumnNotFound(_) | CleansetError::Transform { .. } => e,
            other => CleansetError::Transform {
                index,
                column: op.target_column(),
                message: other.to_string(),
            },
        })?;
        debug!(index, rows = current.height(), cols = current.width(), "applied operation");
    }

    let columns = data::column_info(&current)?;
    let new_row_count = current.height();
    let new_column_count = current.width();

    Ok(TransformResult {
        table: current,
        original_row_count,
        new_row_count,
        removed_row_count: original_row_count.saturating_sub(new_row_count),
        new_column_count,
        column_count_delta: new_column_count as i64 - original_column_count as i64,
        columns,
    })
}

fn apply_one(df: &DataFrame, op: &CleaningOperation) -> Result<DataFrame> {
    match op {
        CleaningOperation::DropColumn { column } => {
            require_column(df, column)?;
            Ok(df.drop(column)?)
        }
        CleaningOperation::FillMissing {
            column,
            method,
            value,
        } => fill_missing(df, column, *method, value.as_ref()),
        CleaningOperation::DropRows { column } => drop_missing_rows(df, column),
        CleaningOperation::DropDuplicates { columns, keep } => {
            for column in columns {
                require_column(df, column)?;
            }
            let strategy = match keep {
                KeepStrategy::First => UniqueKeepStrategy::First,
                KeepStrategy::Last => UniqueKeepStrategy::Last,
            };
            data::dedup(df, columns, strategy)
        }
        CleaningOperation::HandleOutliers {
            column,
            method,
            threshold,
        } => handle_outliers(df, column, *method, *threshold),
        CleaningOperation::EncodeCategorical { column, method } => {
            encode_categorical(df, column, *method)
        }
    }
}

fn require_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map(|c| c.as_materialized_series())
        .map_err(|_| CleansetError::ColumnNotFound(column.to_string()))
}

fn fill_missing(
    df: &DataFrame,
    column: &str,
    method: FillMethod,
    value: Option<&FillValue>,
) -> Result<DataFrame> {
    let series = require_column(df, column)?.clone();

    match method {
        FillMethod::Mean | FillMethod::Median => {
            // Silently skipped on non-numeric columns, matching the advisor's
            // guarantee that these are only suggested for numeric data
            if !series.dtype().is_primitive_numeric() {
                return Ok(df.clone());
            }
            let cast = series.cast(&DataType::Float64)?;
            let ca = cast.f64()?;
            let fill = match method {
                FillMethod::Mean => ca.mean(),
                _ => ca.median(),
            };
            let Some(fill) = fill else {
                return Ok(df.clone());
            };
            replace_with_filled_f64(df, &series, ca, fill)
        }
        FillMethod::Mode => {
            if series.dtype().is_primitive_numeric() {
                let cast = series.cast(&DataType::Float64)?;
                let ca = cast.f64()?;
                let Some(fill) = data::numeric_mode(ca) else {
                    return Ok(df.clone());
                };
                replace_with_filled_f64(df, &series, ca, fill)
            } else {
                let cast = series.cast(&DataType::String)?;
                let ca = cast.str()?;
                let Some(fill) = data::string_mode(ca.into_iter()) else {
                    return Ok(df.clone());
                };
                replace_with_filled_str(df, &series, ca, &fill)
            }
        }
        FillMethod::Constant => {
            let value = value.ok_or_else(|| {
                CleansetError::Data("constant fill requires a value".to_string())
            })?;
            match (series.dtype().is_primitive_numeric(), value) {
                (true, FillValue::Number(v)) => {
                    let cast = series.cast(&DataType::Float64)?;
                    let ca = cast.f64()?;
                    replace_with_filled_f64(df, &series, ca, *v)
                }
                (true, FillValue::Text(t)) => {
                    let parsed: f64 = t.parse().map_err(|_| {
                        CleansetError::Data(format!(
                            "cannot fill numeric column '{column}' with '{t}'"
                        ))
                    })?;
                    let cast = series.cast(&DataType::Float64)?;
                    let ca = cast.f64()?;
                    replace_with_filled_f64(df, &series, ca, parsed)
                }
                (false, value) => {
                    let text = match value {
                        FillValue::Number(v) => v.to_string(),
                        FillValue::Text(t) => t.clone(),
                    };
                    let cast = series.cast(&DataType::String)?;
                    let ca = cast.str()?;
                    replace_with_filled_str(df, &series, ca, &text)
                }
            }
        }
        FillMethod::Drop => drop_missing_rows(df, column),
    }
}

fn replace_with_filled_f64(
    df: &DataFrame,
    original: &Series,
    ca: &Float64Chunked,
    fill: f64,
) -> Result<DataFrame> {
    let filled: Float64Chunked = ca
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill)))
        .collect();
    let mut result = df.clone();
    result
        .with_column(filled.with_name(original.name().clone()).into_series())?;
    Ok(result)
}

fn replace_with_filled_str(
    df: &DataFrame,
    original: &Series,
    ca: &StringChunked,
    fill: &str,
) -> Result<DataFrame> {
    let filled: StringChunked = ca
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(fill).to_string()))
        .collect();
    let mut result = df.clone();
    result
        .with_column(filled.with_name(original.name().clone()).into_series())?;
    Ok(result)
}

fn drop_missing_rows(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = require_column(df, column)?;
    let mask = series.is_not_null();
    Ok(df.filter(&mask)?)
}

fn handle_outliers(
    df: &DataFrame,
    column: &str,
    method: OutlierAction,
    threshold: f64,
) -> Result<DataFrame> {
    let series = require_column(df, column)?.clone();
    // Non-numeric columns pass through untouched
    if !series.dtype().is_primitive_numeric() {
        return Ok(df.clone());
    }
    let cast = series.cast(&DataType::Float64)?;
    let ca = cast.f64()?;

    let Some((lower, upper)) = data::iqr_bounds(ca, threshold)? else {
        return Ok(df.clone());
    };

    match method {
        OutlierAction::Drop => {
            // Rows with a missing value in the column are dropped too, same
            // as a range comparison would treat them
            let mask: BooleanChunked = ca
                .into_iter()
                .map(|opt| opt.is_some_and(|v| v >= lower && v <= upper))
                .collect();
            Ok(df.filter(&mask.with_name(series.name().clone()))?)
        }
        OutlierAction::Cap => {
            let capped: Float64Chunked = ca
                .into_iter()
                .map(|opt| opt.map(|v| v.clamp(lower, upper)))
                .collect();
            let mut result = df.clone();
            result.with_column(capped.with_name(series.name().clone()).into_series())?;
            Ok(result)
        }
    }
}

fn encode_categorical(df: &DataFrame, column: &str, method: EncodeMethod) -> Result<DataFrame> {
    let series = require_column(df, column)?.clone();
    let values = data::canonical_str_values(&series)?;

    // Category order is first observed occurrence
    let mut categories: Vec<String> = Vec::new();
    for v in values.iter().flatten() {
        if !categories.iter().any(|c| c == v) {
            categories.push(v.clone());
        }
    }

    match method {
        EncodeMethod::OneHot => {
            let mut result = df.clone();
            for category in &categories {
                let name = format!("{column}_{category}");
                if df.column(&name).is_ok() {
                    return Err(CleansetError::Data(format!(
                        "encoding '{column}' would overwrite existing column '{name}'"
                    )));
                }
                let indicators: Vec<i32> = values
                    .iter()
                    .map(|v| i32::from(v.as_deref() == Some(category.as_str())))
                    .collect();
                result.with_column(Series::new(name.into(), indicators))?;
            }
            Ok(result.drop(column)?)
        }
        EncodeMethod::Label => {
            let codes: Vec<Option<i64>> = values
                .iter()
                .map(|v| {
                    v.as_deref().map(|s| {
                        categories.iter().position(|c| c == s).unwrap_or(0) as i64
                    })
                })
                .collect();
            let mut result = df.clone();
            result.with_column(Series::new(series.name().clone(), codes))?;
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "color".into(),
                &[Some("red"), Some("red"), Some("blue"), None],
            ),
            Column::new("price".into(), &[Some(10.0), Some(20.0), None, Some(40.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_column_refreshes_column_info() {
        let df = test_table();
        let result = apply(
            &df,
            &[CleaningOperation::DropColumn {
                column: "color".to_string(),
            }],
        )
        .unwrap();

        assert!(result.columns.iter().all(|c| c.name != "color"));
        assert_eq!(result.column_count_delta, -1);
    }

    #[test]
    fn test_drop_missing_column_fails() {
        let df = test_table();
        let err = apply(
            &df,
            &[CleaningOperation::DropColumn {
                column: "ghost".to_string(),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, CleansetError::ColumnNotFound(_)));
    }

    #[test]
    fn test_mean_fill_clears_missing() {
        let df = test_table();
        let result = apply(
            &df,
            &[CleaningOperation::FillMissing {
                column: "price".to_string(),
                method: FillMethod::Mean,
                value: None,
            }],
        )
        .unwrap();

        let info = result
            .columns
            .iter()
            .find(|c| c.name == "price")
            .unwrap();
        assert_eq!(info.missing_count, 0);

        let col = result.table.column("price").unwrap().f64().unwrap();
        let mean = (10.0 + 20.0 + 40.0) / 3.0;
        assert!((col.get(2).unwrap() - mean).abs() < 1e-9);
    }

    #[test]
    fn test_median_fill_uses_median_not_mean() {
        let df = DataFrame::new(vec![Column::new(
            "price".into(),
            &[Some(1.0), Some(2.0), Some(100.0), None],
        )])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::FillMissing {
                column: "price".to_string(),
                method: FillMethod::Median,
                value: None,
            }],
        )
        .unwrap();

        // A skewed column separates the two statistics
        let col = result.table.column("price").unwrap().f64().unwrap();
        assert_eq!(col.get(3), Some(2.0));
    }

    #[test]
    fn test_mean_fill_on_text_is_noop() {
        let df = test_table();
        let result = apply(
            &df,
            &[CleaningOperation::FillMissing {
                column: "color".to_string(),
                method: FillMethod::Mean,
                value: None,
            }],
        )
        .unwrap();
        let info = result.columns.iter().find(|c| c.name == "color").unwrap();
        assert_eq!(info.missing_count, 1);
    }

    #[test]
    fn test_mode_fill_on_text() {
        let df = test_table();
        let result = apply(
            &df,
            &[CleaningOperation::FillMissing {
                column: "color".to_string(),
                method: FillMethod::Mode,
                value: None,
            }],
        )
        .unwrap();

        let col = result.table.column("color").unwrap().str().unwrap();
        assert_eq!(col.get(3), Some("red"));
    }

    #[test]
    fn test_drop_duplicates_idempotent() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[1, 1, 2, 1]),
            Column::new("b".into(), &["x", "x", "y", "x"]),
        ])
        .unwrap();
        let op = CleaningOperation::DropDuplicates {
            columns: vec![],
            keep: KeepStrategy::First,
        };

        let once = apply(&df, std::slice::from_ref(&op)).unwrap();
        let twice = apply(&df, &[op.clone(), op]).unwrap();

        assert_eq!(once.table, twice.table);
        assert_eq!(once.new_row_count, 2);
    }

    #[test]
    fn test_drop_duplicates_keep_last() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[1, 1, 2]),
            Column::new("b".into(), &["x", "y", "z"]),
        ])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::DropDuplicates {
                columns: vec!["a".to_string()],
                keep: KeepStrategy::Last,
            }],
        )
        .unwrap();

        // The final occurrence of a=1 survives, order preserved otherwise
        assert_eq!(result.new_row_count, 2);
        let b = result.table.column("b").unwrap().str().unwrap();
        assert_eq!(b.get(0), Some("y"));
        assert_eq!(b.get(1), Some("z"));
    }

    #[test]
    fn test_handle_outliers_cap_preserves_rows() {
        let df = DataFrame::new(vec![Column::new(
            "x".into(),
            &[1.0, 2.0, 2.0, 3.0, 100.0],
        )])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::HandleOutliers {
                column: "x".to_string(),
                method: OutlierAction::Cap,
                threshold: 1.5,
            }],
        )
        .unwrap();

        assert_eq!(result.new_row_count, 5);
        let col = result.table.column("x").unwrap().f64().unwrap();
        assert!(col.get(4).unwrap() < 100.0);
    }

    #[test]
    fn test_handle_outliers_drop_removes_rows() {
        let df = DataFrame::new(vec![Column::new(
            "x".into(),
            &[1.0, 2.0, 2.0, 3.0, 100.0],
        )])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::HandleOutliers {
                column: "x".to_string(),
                method: OutlierAction::Drop,
                threshold: 1.5,
            }],
        )
        .unwrap();

        assert_eq!(result.new_row_count, 4);
        assert_eq!(result.removed_row_count, 1);
    }

    #[test]
    fn test_one_hot_keeps_all_categories_first_seen() {
        let df = DataFrame::new(vec![Column::new(
            "color".into(),
            &["red", "blue", "red", "green"],
        )])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::EncodeCategorical {
                column: "color".to_string(),
                method: EncodeMethod::OneHot,
            }],
        )
        .unwrap();

        let names: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["color_red", "color_blue", "color_green"]);

        let red = result.table.column("color_red").unwrap().i32().unwrap();
        assert_eq!(red.get(0), Some(1));
        assert_eq!(red.get(1), Some(0));
    }

    #[test]
    fn test_one_hot_refuses_to_overwrite_existing_column() {
        let df = DataFrame::new(vec![
            Column::new("color".into(), &["red", "blue"]),
            Column::new("color_red".into(), &[7, 8]),
        ])
        .unwrap();
        let err = apply(
            &df,
            &[CleaningOperation::EncodeCategorical {
                column: "color".to_string(),
                method: EncodeMethod::OneHot,
            }],
        )
        .unwrap_err();

        match err {
            CleansetError::Transform { index, column, message } => {
                assert_eq!(index, 0);
                assert_eq!(column, "color");
                assert!(message.contains("color_red"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The pre-existing column is untouched
        assert_eq!(
            df.column("color_red").unwrap().i32().unwrap().get(0),
            Some(7)
        );
    }

    #[test]
    fn test_label_encoding_first_seen_order() {
        let df = DataFrame::new(vec![Column::new(
            "color".into(),
            &["blue", "red", "blue", "green"],
        )])
        .unwrap();
        let result = apply(
            &df,
            &[CleaningOperation::EncodeCategorical {
                column: "color".to_string(),
                method: EncodeMethod::Label,
            }],
        )
        .unwrap();

        let codes = result.table.column("color").unwrap().i64().unwrap();
        assert_eq!(codes.get(0), Some(0));
        assert_eq!(codes.get(1), Some(1));
        assert_eq!(codes.get(2), Some(0));
        assert_eq!(codes.get(3), Some(2));
    }

    #[test]
    fn test_failure_reports_operation_index() {
        let df = test_table();
        let ops = vec![
            CleaningOperation::FillMissing {
                column: "price".to_string(),
                method: FillMethod::Mean,
                value: None,
            },
            CleaningOperation::FillMissing {
                column: "price".to_string(),
                method: FillMethod::Constant,
                value: None,
            },
        ];
        let err = apply(&df, &ops).unwrap_err();
        match err {
            CleansetError::Transform { index, column, .. } => {
                assert_eq!(index, 1);
                assert_eq!(column, "price");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The caller's table is untouched on failure
        assert_eq!(df.column("price").unwrap().null_count(), 1);
    }

    #[test]
    fn test_cleaning_report_shape() {
        let df = test_table();
        let result = apply(
            &df,
            &[CleaningOperation::DropRows {
                column: "price".to_string(),
            }],
        )
        .unwrap();
        let report = CleaningReport::from_result(&result, 5).unwrap();

        assert!(report.success);
        assert_eq!(report.original_count, 4);
        assert_eq!(report.cleaned_count, 3);
        assert_eq!(report.removed_count, 1);
        assert_eq!(report.preview.len(), 3);
    }
}
