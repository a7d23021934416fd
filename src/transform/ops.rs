//! Cleaning operation wire types
//!
//! These serialize to the request format the cleaning endpoint accepts:
//! `{type, column, method?, value?, columns?, keep?, threshold?}`.

use serde::{Deserialize, Serialize};

/// A single cleaning operation, applied by the transform engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleaningOperation {
    /// Remove a column entirely
    DropColumn { column: String },

    /// Fill (or drop) missing values in one column
    FillMissing {
        column: String,
        method: FillMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<FillValue>,
    },

    /// Remove every row with a missing value in the named column
    DropRows { column: String },

    /// Remove rows duplicating an earlier row on the given column subset;
    /// an empty subset compares whole rows
    DropDuplicates {
        #[serde(default)]
        columns: Vec<String>,
        #[serde(default)]
        keep: KeepStrategy,
    },

    /// Drop or cap rows outside the IQR fence of the column's current state
    HandleOutliers {
        column: String,
        method: OutlierAction,
        #[serde(default = "default_iqr_threshold")]
        threshold: f64,
    },

    /// Expand a categorical column into indicators or integer codes
    EncodeCategorical {
        column: String,
        method: EncodeMethod,
    },
}

impl CleaningOperation {
    /// The column the operation primarily targets, for error reporting.
    /// Multi-column operations report a joined list.
    pub fn target_column(&self) -> String {
        match self {
            CleaningOperation::DropColumn { column }
            | CleaningOperation::FillMissing { column, .. }
            | CleaningOperation::DropRows { column }
            | CleaningOperation::HandleOutliers { column, .. }
            | CleaningOperation::EncodeCategorical { column, .. } => column.clone(),
            CleaningOperation::DropDuplicates { columns, .. } => {
                if columns.is_empty() {
                    "*".to_string()
                } else {
                    columns.join(",")
                }
            }
        }
    }
}

fn default_iqr_threshold() -> f64 {
    1.5
}

/// Strategy for `FillMissing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Mean,
    Median,
    Mode,
    Constant,
    Drop,
}

/// Caller-supplied constant for `FillMethod::Constant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

/// Which occurrence in a duplicate group survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepStrategy {
    #[default]
    First,
    Last,
}

/// What to do with rows outside the IQR fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierAction {
    Drop,
    Cap,
}

/// Encoder flavor for `EncodeCategorical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeMethod {
    OneHot,
    Label,
}
