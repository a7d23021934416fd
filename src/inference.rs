//! Training and batch-scoring entry points
//!
//! `run_training` fits the pipeline and model from one table and persists
//! both artifacts; `run_inference` loads those artifacts read-only and
//! scores a fresh table.

use crate::error::Result;
use crate::pipeline::{FeaturePipeline, PipelineConfig};
use crate::training::{GradientBoostingConfig, RegressionMetrics, TrainedModel, Trainer};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

/// One scored row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub id: String,
    pub predicted_value: f64,
}

/// Distribution summary over a batch of predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Batch scoring response
#[derive(Debug, Clone, Serialize)]
pub struct InferenceReport {
    pub predictions: Vec<Prediction>,
    pub summary: PredictionSummary,
}

/// Fit the pipeline and model on `df`, persist both artifacts, and return
/// the held-out metrics
pub fn run_training(
    df: &DataFrame,
    pipeline_config: PipelineConfig,
    model_config: GradientBoostingConfig,
    pipeline_path: &str,
    model_path: &str,
) -> Result<RegressionMetrics> {
    let mut pipeline = FeaturePipeline::new(pipeline_config);
    let (features, target) = pipeline.fit(df)?;

    let trainer = Trainer::new().with_config(model_config);
    let model = trainer.train(
        &features,
        &target,
        pipeline.config().log_transform_target,
        pipeline.feature_names().to_vec(),
    )?;

    pipeline.save(pipeline_path)?;
    model.save(model_path)?;

    Ok(model.metrics().clone())
}

/// Score a fresh table against previously persisted artifacts.
///
/// The table must carry the same feature-relevant columns the pipeline was
/// fit on; the identifier column is optional and echoed back when present
/// (row index otherwise).
pub fn run_inference(
    df: &DataFrame,
    pipeline_path: &str,
    model_path: &str,
) -> Result<InferenceReport> {
    let pipeline = FeaturePipeline::load(pipeline_path)?;
    let model = TrainedModel::load(model_path)?;

    let (features, ids) = pipeline.transform(df)?;
    let values = model.predict(&features)?;

    let ids = ids.unwrap_or_else(|| (0..df.height()).map(|i| i.to_string()).collect());
    let predictions: Vec<Prediction> = ids
        .into_iter()
        .zip(values.iter())
        .map(|(id, &predicted_value)| Prediction {
            id,
            predicted_value,
        })
        .collect();

    let summary = summarize(&predictions);
    info!(count = summary.count, mean = summary.mean, "scored batch");

    Ok(InferenceReport {
        predictions,
        summary,
    })
}

fn summarize(predictions: &[Prediction]) -> PredictionSummary {
    let mut values: Vec<f64> = predictions.iter().map(|p| p.predicted_value).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = values.len();
    if count == 0 {
        return PredictionSummary {
            count: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    } else {
        values[count / 2]
    };

    PredictionSummary {
        count,
        mean,
        median,
        min: values[0],
        max: values[count - 1],
    }
}
