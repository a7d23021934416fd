//! Feature Pipeline
//!
//! Builds the model-ready feature matrix and freezes every statistic needed
//! to reproduce it at inference time. `transform` replays only stored state;
//! it never re-derives column types, imputation values, or category sets
//! from the incoming table, so a table with a different category
//! distribution still produces the exact same output columns.

use crate::data;
use crate::error::{CleansetError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Column naming conventions for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id_column: String,
    pub target_column: String,
    /// Train on ln(1 + target) and invert at prediction time
    pub log_transform_target: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id_column: "Id".to_string(),
            target_column: "SalePrice".to_string(),
            log_transform_target: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_column(mut self, name: &str) -> Self {
        self.id_column = name.to_string();
        self
    }

    pub fn with_target_column(mut self, name: &str) -> Self {
        self.target_column = name.to_string();
        self
    }

    pub fn with_log_transform_target(mut self, enabled: bool) -> Self {
        self.log_transform_target = enabled;
        self
    }
}

/// Fitted statistics for one numeric feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub median: f64,
    pub mean: f64,
    pub std: f64,
}

/// Fitted statistics for one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub mode: String,
    /// Category order is fixed at fit time (lexicographic)
    pub categories: Vec<String>,
}

/// The fitted pipeline, persisted alongside the model it fed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    numeric_features: Vec<String>,
    categorical_features: Vec<String>,
    numeric_stats: HashMap<String, NumericStats>,
    categorical_stats: HashMap<String, CategoricalStats>,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            numeric_features: Vec::new(),
            categorical_features: Vec::new(),
            numeric_stats: HashMap::new(),
            categorical_stats: HashMap::new(),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit on a training table and return the feature matrix plus the
    /// (possibly log-transformed) target vector
    pub fn fit(&mut self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        let target_col = df
            .column(&self.config.target_column)
            .map_err(|_| CleansetError::ColumnNotFound(self.config.target_column.clone()))?
            .as_materialized_series()
            .clone();

        // Rows without a target value cannot participate in training
        let df = df.filter(&target_col.is_not_null())?;
        let target_series = df
            .column(&self.config.target_column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let target_values = target_series.f64()?;

        let target: Array1<f64> = target_values
            .into_iter()
            .map(|opt| {
                let v = opt.unwrap_or(0.0);
                if self.config.log_transform_target {
                    v.ln_1p()
                } else {
                    v
                }
            })
            .collect();

        let features_df = self.feature_view(&df)?;
        self.partition_columns(&features_df)?;
        self.fit_numeric_stats(&features_df)?;
        self.fit_categorical_stats(&features_df)?;
        self.freeze_feature_names();
        self.is_fitted = true;

        let matrix = self.encode(&features_df)?;
        info!(
            rows = matrix.nrows(),
            numeric = self.numeric_features.len(),
            categorical = self.categorical_features.len(),
            features = self.feature_names.len(),
            "fitted feature pipeline"
        );
        Ok((matrix, target))
    }

    /// Encode a table using stored fit-time state only.
    ///
    /// Returns the feature matrix and, when the identifier column is present,
    /// its values (row index as fallback for missing entries).
    pub fn transform(&self, df: &DataFrame) -> Result<(Array2<f64>, Option<Vec<String>>)> {
        if !self.is_fitted {
            return Err(CleansetError::NotFitted);
        }

        let missing: Vec<&String> = self
            .numeric_features
            .iter()
            .chain(self.categorical_features.iter())
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            return Err(CleansetError::PipelineMismatch(format!(
                "missing feature columns: {}",
                names.join(", ")
            )));
        }

        let ids = match df.column(&self.config.id_column) {
            Ok(col) => {
                let values = data::canonical_str_values(col.as_materialized_series())?;
                Some(
                    values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| v.unwrap_or_else(|| i.to_string()))
                        .collect(),
                )
            }
            Err(_) => None,
        };

        let matrix = self.encode(df)?;
        Ok((matrix, ids))
    }

    /// Output column names, numeric features first, then per-column
    /// category indicators named `{column}_{value}`
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn numeric_features(&self) -> &[String] {
        &self.numeric_features
    }

    pub fn categorical_features(&self) -> &[String] {
        &self.categorical_features
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Persist the fitted state as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        info!(path, "saved pipeline artifact");
        Ok(())
    }

    /// Load a previously saved pipeline
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        let pipeline: Self = serde_json::from_str(&json)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        Ok(pipeline)
    }

    /// The feature columns: everything except the identifier and the target
    fn feature_view(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        if result.column(&self.config.id_column).is_ok() {
            result = result.drop(&self.config.id_column)?;
        }
        if result.column(&self.config.target_column).is_ok() {
            result = result.drop(&self.config.target_column)?;
        }
        Ok(result)
    }

    /// Freeze the numeric/categorical partition. A column is categorical
    /// when its dtype is non-numeric or it has fewer than 10 distinct
    /// non-null values.
    fn partition_columns(&mut self, df: &DataFrame) -> Result<()> {
        self.numeric_features.clear();
        self.categorical_features.clear();

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = series.name().to_string();
            let low_cardinality = data::non_null_unique(series)? < 10;

            if !series.dtype().is_primitive_numeric() || low_cardinality {
                self.categorical_features.push(name);
            } else {
                self.numeric_features.push(name);
            }
        }
        Ok(())
    }

    fn fit_numeric_stats(&mut self, df: &DataFrame) -> Result<()> {
        self.numeric_stats.clear();

        for name in &self.numeric_features {
            let series = df.column(name)?.as_materialized_series();
            let cast = series.cast(&DataType::Float64)?;
            let ca = cast.f64()?;

            let median = ca.median().unwrap_or(0.0);

            // Scaling statistics are computed over the imputed values,
            // the same data the scaler would see downstream
            let imputed: Vec<f64> = ca
                .into_iter()
                .map(|opt| opt.unwrap_or(median))
                .collect();
            let n = imputed.len() as f64;
            let mean = imputed.iter().sum::<f64>() / n;
            let variance = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let mut std = variance.sqrt();
            if std < 1e-10 {
                std = 1.0;
            }

            self.numeric_stats
                .insert(name.clone(), NumericStats { median, mean, std });
        }
        Ok(())
    }

    fn fit_categorical_stats(&mut self, df: &DataFrame) -> Result<()> {
        self.categorical_stats.clear();

        for name in &self.categorical_features {
            let series = df.column(name)?.as_materialized_series();
            let values = data::canonical_str_values(series)?;

            let mode = data::string_mode(values.iter().map(|v| v.as_deref()))
                .unwrap_or_default();

            let mut categories: Vec<String> = values.into_iter().flatten().collect();
            categories.sort();
            categories.dedup();
            // The mode replaces missing values before encoding, so it is
            // always part of the category set
            if !categories.contains(&mode) && !mode.is_empty() {
                categories.push(mode.clone());
                categories.sort();
            }

            self.categorical_stats
                .insert(name.clone(), CategoricalStats { mode, categories });
        }
        Ok(())
    }

    fn freeze_feature_names(&mut self) {
        self.feature_names = self.numeric_features.clone();
        for name in &self.categorical_features {
            if let Some(stats) = self.categorical_stats.get(name) {
                for category in &stats.categories {
                    self.feature_names.push(format!("{name}_{category}"));
                }
            }
        }
    }

    fn encode(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let n_cols = self.feature_names.len();
        let mut matrix = Array2::zeros((n_rows, n_cols));

        for (j, name) in self.numeric_features.iter().enumerate() {
            let stats = &self.numeric_stats[name];
            let series = df.column(name)?.as_materialized_series();
            let cast = series.cast(&DataType::Float64)?;
            let ca = cast.f64()?;

            for (i, opt) in ca.into_iter().enumerate() {
                let v = opt.unwrap_or(stats.median);
                matrix[[i, j]] = (v - stats.mean) / stats.std;
            }
        }

        let mut offset = self.numeric_features.len();
        for name in &self.categorical_features {
            let stats = &self.categorical_stats[name];
            let series = df.column(name)?.as_materialized_series();
            let values = data::canonical_str_values(series)?;

            for (i, opt) in values.iter().enumerate() {
                let value = opt.as_deref().unwrap_or(stats.mode.as_str());
                // Unseen categories leave the whole block at zero
                if let Ok(pos) = stats.categories.binary_search_by(|c| c.as_str().cmp(value)) {
                    matrix[[i, offset + pos]] = 1.0;
                }
            }
            offset += stats.categories.len();
        }

        Ok(matrix)
    }
}
