//! The four suggestion detectors

use super::{Priority, ReasonCode, Suggestion};
use crate::data;
use crate::error::Result;
use crate::transform::{
    CleaningOperation, EncodeMethod, FillMethod, KeepStrategy, OutlierAction,
};
use polars::prelude::*;

/// Columns with missing values: drop when more than half is gone, otherwise
/// fill with the mean (numeric) or mode (everything else)
pub(super) fn detect_missing_values(df: &DataFrame) -> Result<Vec<Suggestion>> {
    let row_count = df.height();
    let mut suggestions = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let missing_count = series.null_count();
        if missing_count == 0 {
            continue;
        }
        let column = series.name().to_string();
        let missing_ratio = missing_count as f64 / row_count as f64;

        if missing_ratio > 0.5 {
            suggestions.push(Suggestion {
                operation: CleaningOperation::DropColumn {
                    column: column.clone(),
                },
                reason: ReasonCode::HighMissingRatio {
                    column,
                    missing_count,
                    row_count,
                },
                priority: Priority::High,
            });
        } else if series.dtype().is_primitive_numeric() {
            suggestions.push(Suggestion {
                operation: CleaningOperation::FillMissing {
                    column: column.clone(),
                    method: FillMethod::Mean,
                    value: None,
                },
                reason: ReasonCode::MissingNumeric {
                    column,
                    missing_count,
                    row_count,
                },
                priority: Priority::Medium,
            });
        } else {
            suggestions.push(Suggestion {
                operation: CleaningOperation::FillMissing {
                    column: column.clone(),
                    method: FillMethod::Mode,
                    value: None,
                },
                reason: ReasonCode::MissingCategorical {
                    column,
                    missing_count,
                    row_count,
                },
                priority: Priority::Medium,
            });
        }
    }

    Ok(suggestions)
}

/// Whole-row duplicates, plus duplicates over candidate key combinations
pub(super) fn detect_duplicates(df: &DataFrame) -> Result<Vec<Suggestion>> {
    let row_count = df.height();
    let mut suggestions = Vec::new();

    let whole_row = data::duplicate_count(df, &[])?;
    if whole_row > 0 {
        let ratio = whole_row as f64 / row_count as f64;
        suggestions.push(Suggestion {
            operation: CleaningOperation::DropDuplicates {
                columns: Vec::new(),
                keep: KeepStrategy::First,
            },
            reason: ReasonCode::DuplicateRows {
                duplicate_count: whole_row,
                row_count,
            },
            priority: if ratio > 0.05 {
                Priority::High
            } else {
                Priority::Medium
            },
        });
    }

    let candidates = candidate_key_columns(df)?;
    // Combination sizes are bounded to keep the scan cheap
    if (2..=4).contains(&candidates.len()) {
        for combo in combinations(&candidates, 2)
            .into_iter()
            .chain(combinations(&candidates, 3))
        {
            let dup = data::duplicate_count(df, &combo)?;
            if dup > 0 {
                suggestions.push(Suggestion {
                    operation: CleaningOperation::DropDuplicates {
                        columns: combo.clone(),
                        keep: KeepStrategy::First,
                    },
                    reason: ReasonCode::DuplicateKeyCombination {
                        columns: combo,
                        duplicate_count: dup,
                    },
                    priority: Priority::Medium,
                });
            }
        }
    }

    Ok(suggestions)
}

/// Columns that could participate in a logical key: low-cardinality
/// categoricals and columns with id-like names
fn candidate_key_columns(df: &DataFrame) -> Result<Vec<String>> {
    let row_count = df.height();
    let mut candidates = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let name = series.name().to_string();

        let id_like = {
            let lower = name.to_lowercase();
            lower.contains("id") || lower.contains("key") || lower.contains("code")
        };

        let low_card_categorical = data::semantic_type(series.dtype())
            == data::SemanticType::Categorical
            && (data::non_null_unique(series)? as f64) < 0.5 * row_count as f64;

        if id_like || low_card_categorical {
            candidates.push(name);
        }
    }

    Ok(candidates)
}

fn combinations(items: &[String], size: usize) -> Vec<Vec<String>> {
    if size > items.len() {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        result.push(indices.iter().map(|&i| items[i].clone()).collect());

        // Advance to the next combination in lexicographic index order
        let mut i = size;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if indices[i] != i + items.len() - size {
                break;
            }
        }
        indices[i] += 1;
        for j in i + 1..size {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

/// Numeric columns with a small number of values outside the 1.5 IQR fence.
/// Columns where 10% or more of the rows land outside are skipped; that
/// looks like a legitimate heavy tail, not noise.
pub(super) fn detect_outliers(df: &DataFrame) -> Result<Vec<Suggestion>> {
    let row_count = df.height();
    let mut suggestions = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        if !series.dtype().is_primitive_numeric() {
            continue;
        }
        let cast = series.cast(&DataType::Float64)?;
        let ca = cast.f64()?;

        let Some((lower, upper)) = data::iqr_bounds(ca, 1.5)? else {
            continue;
        };

        let outlier_count = ca
            .into_iter()
            .flatten()
            .filter(|&v| v < lower || v > upper)
            .count();

        if outlier_count > 0 && (outlier_count as f64) < 0.1 * row_count as f64 {
            let column = series.name().to_string();
            suggestions.push(Suggestion {
                operation: CleaningOperation::HandleOutliers {
                    column: column.clone(),
                    method: OutlierAction::Drop,
                    threshold: 1.5,
                },
                reason: ReasonCode::IqrOutliers {
                    column,
                    outlier_count,
                    row_count,
                    lower_bound: lower,
                    upper_bound: upper,
                },
                priority: Priority::Medium,
            });
        }
    }

    Ok(suggestions)
}

/// Categorical columns worth encoding: one-hot below 10 distinct values,
/// label encoding above
pub(super) fn detect_low_cardinality(df: &DataFrame) -> Result<Vec<Suggestion>> {
    let row_count = df.height();
    let mut suggestions = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        if data::semantic_type(series.dtype()) != data::SemanticType::Categorical {
            continue;
        }
        let unique_count = data::non_null_unique(series)?;
        if (unique_count as f64) < 0.2 * row_count as f64 {
            let column = series.name().to_string();
            suggestions.push(Suggestion {
                operation: CleaningOperation::EncodeCategorical {
                    column: column.clone(),
                    method: if unique_count < 10 {
                        EncodeMethod::OneHot
                    } else {
                        EncodeMethod::Label
                    },
                },
                reason: ReasonCode::LowCardinality {
                    column,
                    unique_count,
                    row_count,
                },
                priority: Priority::Low,
            });
        }
    }

    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_missing_ratio_suggests_drop() {
        let df = DataFrame::new(vec![Column::new(
            "sparse".into(),
            &[Some(1.0), None, None, None],
        )])
        .unwrap();

        let suggestions = detect_missing_values(&df).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(
            suggestions[0].operation,
            CleaningOperation::DropColumn {
                column: "sparse".to_string()
            }
        );
        assert_eq!(suggestions[0].priority, Priority::High);
    }

    #[test]
    fn test_whole_row_duplicates_priority_scales_with_ratio() {
        // 2 duplicates in 4 rows, ratio 0.5 > 5%
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[1, 1, 1, 2]),
            Column::new("b".into(), &["x", "x", "x", "y"]),
        ])
        .unwrap();

        let suggestions = detect_duplicates(&df).unwrap();
        let whole_row = suggestions
            .iter()
            .find(|s| matches!(s.reason, ReasonCode::DuplicateRows { .. }))
            .unwrap();
        assert_eq!(whole_row.priority, Priority::High);
    }

    #[test]
    fn test_outlier_window_rejects_small_tables() {
        // 1 outlier in 5 rows is 20%, above the 10% ceiling
        let df = DataFrame::new(vec![Column::new(
            "x".into(),
            &[1.0, 2.0, 2.0, 3.0, 100.0],
        )])
        .unwrap();
        assert!(detect_outliers(&df).unwrap().is_empty());
    }

    #[test]
    fn test_outlier_window_accepts_large_tables() {
        // 1 outlier in 20 rows is 5%, inside (0, 10%)
        let mut values = vec![1.0, 2.0, 2.0, 3.0];
        values.extend(std::iter::repeat(2.0).take(15));
        values.push(100.0);
        let df = DataFrame::new(vec![Column::new("x".into(), &values)]).unwrap();

        let suggestions = detect_outliers(&df).unwrap();
        assert_eq!(suggestions.len(), 1);
        match &suggestions[0].reason {
            ReasonCode::IqrOutliers { outlier_count, .. } => {
                assert_eq!(*outlier_count, 1);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn test_low_cardinality_picks_encoder_by_unique_count() {
        let values: Vec<String> = (0..100).map(|i| format!("c{}", i % 5)).collect();
        let df = DataFrame::new(vec![Column::new("color".into(), &values)]).unwrap();

        let suggestions = detect_low_cardinality(&df).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(
            suggestions[0].operation,
            CleaningOperation::EncodeCategorical {
                column: "color".to_string(),
                method: EncodeMethod::OneHot,
            }
        );

        let values: Vec<String> = (0..100).map(|i| format!("c{}", i % 15)).collect();
        let df = DataFrame::new(vec![Column::new("city".into(), &values)]).unwrap();
        let suggestions = detect_low_cardinality(&df).unwrap();
        assert!(matches!(
            suggestions[0].operation,
            CleaningOperation::EncodeCategorical {
                method: EncodeMethod::Label,
                ..
            }
        ));
    }

    #[test]
    fn test_combinations() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let combos = combinations(&items, 2);
        assert_eq!(
            combos,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["a".to_string(), "c".to_string()],
                vec!["b".to_string(), "c".to_string()],
            ]
        );
        assert_eq!(combinations(&items, 3).len(), 1);
        assert!(combinations(&items, 4).is_empty());
    }
}
