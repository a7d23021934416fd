//! Cleaning Advisor
//!
//! Inspects a table and proposes cleaning operations the transform engine
//! can apply directly. `suggest` is a pure function of the table contents:
//! repeated calls on the same table return identical suggestion lists.

mod detectors;

use crate::error::Result;
use crate::transform::CleaningOperation;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Advisory severity of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Structured reason behind a suggestion.
///
/// Carries the evidence (counts, bounds, ratios) rather than prose;
/// display text is rendered only at the boundary via [`ReasonCode::render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasonCode {
    /// More than half the column is missing
    HighMissingRatio {
        column: String,
        missing_count: usize,
        row_count: usize,
    },
    /// Numeric column with some missing values
    MissingNumeric {
        column: String,
        missing_count: usize,
        row_count: usize,
    },
    /// Non-numeric column with some missing values
    MissingCategorical {
        column: String,
        missing_count: usize,
        row_count: usize,
    },
    /// Rows identical across every column
    DuplicateRows {
        duplicate_count: usize,
        row_count: usize,
    },
    /// Rows identical on a candidate key combination
    DuplicateKeyCombination {
        columns: Vec<String>,
        duplicate_count: usize,
    },
    /// Values outside the 1.5 IQR fence
    IqrOutliers {
        column: String,
        outlier_count: usize,
        row_count: usize,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// Categorical column with few distinct values relative to row count
    LowCardinality {
        column: String,
        unique_count: usize,
        row_count: usize,
    },
}

impl ReasonCode {
    /// Human-readable description, for display at the response boundary
    pub fn render(&self) -> String {
        match self {
            ReasonCode::HighMissingRatio {
                column,
                missing_count,
                row_count,
            } => format!(
                "Column '{column}' is missing {missing_count} of {row_count} values (more than 50%)"
            ),
            ReasonCode::MissingNumeric {
                column,
                missing_count,
                row_count,
            } => format!(
                "Numeric column '{column}' has {missing_count} of {row_count} values missing"
            ),
            ReasonCode::MissingCategorical {
                column,
                missing_count,
                row_count,
            } => format!(
                "Column '{column}' has {missing_count} of {row_count} values missing"
            ),
            ReasonCode::DuplicateRows {
                duplicate_count,
                row_count,
            } => format!("{duplicate_count} of {row_count} rows are exact duplicates"),
            ReasonCode::DuplicateKeyCombination {
                columns,
                duplicate_count,
            } => format!(
                "{duplicate_count} rows duplicate the combination ({})",
                columns.join(", ")
            ),
            ReasonCode::IqrOutliers {
                column,
                outlier_count,
                row_count,
                lower_bound,
                upper_bound,
            } => format!(
                "Column '{column}' has {outlier_count} of {row_count} values outside [{lower_bound:.2}, {upper_bound:.2}]"
            ),
            ReasonCode::LowCardinality {
                column,
                unique_count,
                row_count,
            } => format!(
                "Column '{column}' has only {unique_count} distinct values across {row_count} rows"
            ),
        }
    }
}

/// A proposed cleaning operation with its evidence and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub operation: CleaningOperation,
    pub reason: ReasonCode,
    pub priority: Priority,
}

/// Inspect a table and propose cleaning operations.
///
/// Detectors run in a fixed order (missing values, duplicates, outliers,
/// categorical encoding) and their outputs are concatenated, so the result
/// is deterministic for a given table. The table is never modified.
pub fn suggest(df: &DataFrame) -> Result<Vec<Suggestion>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let mut suggestions = detectors::detect_missing_values(df)?;
    suggestions.extend(detectors::detect_duplicates(df)?);
    suggestions.extend(detectors::detect_outliers(df)?);
    suggestions.extend(detectors::detect_low_cardinality(df)?);

    Ok(suggestions)
}
