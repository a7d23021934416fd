//! Model training and scoring
//!
//! Splits the feature matrix into train and validation folds with a fixed
//! seed, fits the boosted ensemble, and reports validation metrics on the
//! original target scale (the log transform is inverted before scoring).

pub mod decision_tree;
pub mod gradient_boosting;
mod metrics;

pub use decision_tree::DecisionTree;
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use metrics::RegressionMetrics;

use crate::error::{CleansetError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Minimum usable rows for a train/validation split
const MIN_TRAINING_ROWS: usize = 10;

/// Orchestrates a single training run
pub struct Trainer {
    config: GradientBoostingConfig,
    test_size: f64,
    random_state: u64,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer {
    pub fn new() -> Self {
        Self {
            config: GradientBoostingConfig::default(),
            test_size: 0.2,
            random_state: 42,
        }
    }

    pub fn with_config(mut self, config: GradientBoostingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Train on `features`/`target` and score on the held-out fold.
    ///
    /// `target` is the (possibly log-transformed) vector the pipeline
    /// produced; `log_transform_target` tells the scorer to invert it so
    /// RMSE and R² are reported on the original scale.
    pub fn train(
        &self,
        features: &Array2<f64>,
        target: &Array1<f64>,
        log_transform_target: bool,
        feature_names: Vec<String>,
    ) -> Result<TrainedModel> {
        let n_samples = features.nrows();
        if n_samples != target.len() {
            return Err(CleansetError::Shape {
                expected: format!("target length = {n_samples}"),
                actual: format!("target length = {}", target.len()),
            });
        }
        if n_samples < MIN_TRAINING_ROWS {
            return Err(CleansetError::InsufficientData {
                rows: n_samples,
                required: MIN_TRAINING_ROWS,
            });
        }

        let start = Instant::now();
        let (train_idx, val_idx) = train_val_split(n_samples, self.test_size, self.random_state);

        let x_train = features.select(Axis(0), &train_idx);
        let y_train: Array1<f64> = train_idx.iter().map(|&i| target[i]).collect();
        let x_val = features.select(Axis(0), &val_idx);
        let y_val: Array1<f64> = val_idx.iter().map(|&i| target[i]).collect();

        let mut model = GradientBoostingRegressor::new(self.config.clone());
        model.fit(&x_train, &y_train)?;

        let val_pred = model.predict(&x_val)?;
        // Score on the original scale
        let (y_val, val_pred) = if log_transform_target {
            (y_val.mapv(f64::exp_m1), val_pred.mapv(f64::exp_m1))
        } else {
            (y_val, val_pred)
        };

        // n_samples stays the evaluated fold size set by compute
        let mut metrics = RegressionMetrics::compute(&y_val, &val_pred);
        metrics.n_features = features.ncols();
        metrics.training_time_secs = start.elapsed().as_secs_f64();

        info!(
            rmse = metrics.rmse,
            r2 = metrics.r2,
            trees = model.n_trees(),
            elapsed = metrics.training_time_secs,
            "training run complete"
        );

        Ok(TrainedModel {
            model,
            metrics,
            log_transform_target,
            feature_names,
        })
    }
}

/// A fitted model plus everything needed to serve it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    model: GradientBoostingRegressor,
    metrics: RegressionMetrics,
    log_transform_target: bool,
    feature_names: Vec<String>,
}

impl TrainedModel {
    /// Predict on the original target scale
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.feature_names.len() {
            return Err(CleansetError::Shape {
                expected: format!("{} feature columns", self.feature_names.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        let raw = self.model.predict(features)?;
        if self.log_transform_target {
            Ok(raw.mapv(f64::exp_m1))
        } else {
            Ok(raw)
        }
    }

    pub fn metrics(&self) -> &RegressionMetrics {
        &self.metrics
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn log_transform_target(&self) -> bool {
        self.log_transform_target
    }

    /// Persist the model as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        info!(path, "saved model artifact");
        Ok(())
    }

    /// Load a previously saved model
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        let model: Self = serde_json::from_str(&json)
            .map_err(|e| CleansetError::Persistence(format!("{path}: {e}")))?;
        Ok(model)
    }
}

/// Shuffled train/validation index split with a fixed seed
fn train_val_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_val = ((n as f64) * test_size).ceil() as usize;
    let n_val = n_val.clamp(1, n - 1);

    let mut val: Vec<usize> = indices[..n_val].to_vec();
    let mut train: Vec<usize> = indices[n_val..].to_vec();
    val.sort();
    train.sort();
    (train, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        // Few distinct feature values with a deterministic target so both
        // folds see every region of the feature space
        let x = Array2::from_shape_fn((n, 1), |(i, _)| (i % 4) as f64);
        let y: Array1<f64> = (0..n).map(|i| 10.0 + 5.0 * (i % 4) as f64).collect();
        (x, y)
    }

    fn quick_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_train_reports_original_scale_metrics() {
        let (x, y_raw) = synthetic_data(40);
        let y_log = y_raw.mapv(f64::ln_1p);

        let trainer = Trainer::new().with_config(quick_config());
        let model = trainer.train(&x, &y_log, true, vec!["f".to_string()]).unwrap();

        // Deterministic target, enough rounds: near-exact recovery
        assert!(model.metrics().rmse < 1.0, "rmse = {}", model.metrics().rmse);
        assert!(model.metrics().r2 > 0.95, "r2 = {}", model.metrics().r2);
        // Metrics describe the validation fold, not the whole table
        assert_eq!(model.metrics().n_samples, 8);
        assert_eq!(model.metrics().n_features, 1);
    }

    #[test]
    fn test_predict_inverts_log_transform() {
        let (x, y_raw) = synthetic_data(40);
        let y_log = y_raw.mapv(f64::ln_1p);

        let trainer = Trainer::new().with_config(quick_config());
        let model = trainer.train(&x, &y_log, true, vec!["f".to_string()]).unwrap();

        let preds = model.predict(&x).unwrap();
        // predict = expm1(raw model output)
        for (i, p) in preds.iter().enumerate() {
            let expected = 10.0 + 5.0 * (i % 4) as f64;
            assert!((p - expected).abs() < 2.0, "row {i}: {p} vs {expected}");
        }
    }

    #[test]
    fn test_too_few_rows() {
        let (x, y) = synthetic_data(8);
        let trainer = Trainer::new();
        let err = trainer.train(&x, &y, false, vec!["f".to_string()]).unwrap_err();
        match err {
            CleansetError::InsufficientData { rows, required } => {
                assert_eq!(rows, 8);
                assert_eq!(required, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let (a_train, a_val) = train_val_split(100, 0.2, 42);
        let (b_train, b_val) = train_val_split(100, 0.2, 42);
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);
        assert_eq!(a_val.len(), 20);
        assert_eq!(a_train.len(), 80);
        assert!(a_val.iter().all(|i| !a_train.contains(i)));
    }

    #[test]
    fn test_model_save_load_roundtrip() {
        let (x, y) = synthetic_data(40);
        let trainer = Trainer::new().with_config(GradientBoostingConfig {
            n_estimators: 20,
            ..quick_config()
        });
        let model = trainer.train(&x, &y, false, vec!["f".to_string()]).unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        model.save(path).unwrap();
        let loaded = TrainedModel::load(path).unwrap();

        assert_eq!(loaded.metrics(), model.metrics());
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_shape_mismatch() {
        let (x, y) = synthetic_data(40);
        let trainer = Trainer::new().with_config(GradientBoostingConfig {
            n_estimators: 5,
            ..quick_config()
        });
        let model = trainer.train(&x, &y, false, vec!["f".to_string()]).unwrap();

        let wrong = Array2::zeros((3, 2));
        assert!(matches!(
            model.predict(&wrong),
            Err(CleansetError::Shape { .. })
        ));
    }
}
