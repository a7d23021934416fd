//! cleanset - Tabular data cleaning advisor and regression pipeline
//!
//! This crate loads tabular datasets, proposes and applies cleaning
//! operations, and trains a gradient-boosted regression model with strict
//! feature parity between training and inference.
//!
//! # Modules
//!
//! - [`data`] - File loading, column metadata, and previews
//! - [`advisor`] - Cleaning suggestions derived from the table contents
//! - [`transform`] - Ordered application of cleaning operations
//! - [`pipeline`] - Frozen feature engineering (impute, scale, encode)
//! - [`training`] - Gradient boosted trees, train/validation scoring
//! - [`inference`] - End-to-end training and batch-scoring entry points

pub mod error;

pub mod advisor;
pub mod data;
pub mod inference;
pub mod pipeline;
pub mod training;
pub mod transform;

pub use error::{CleansetError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CleansetError, Result};

    // Data loading and inspection
    pub use crate::data::{ColumnInfo, DataLoader, SemanticType};

    // Advisor
    pub use crate::advisor::{suggest, Priority, ReasonCode, Suggestion};

    // Transform engine
    pub use crate::transform::{
        apply, CleaningOperation, CleaningReport, EncodeMethod, FillMethod, FillValue,
        KeepStrategy, OutlierAction, TransformResult,
    };

    // Feature pipeline
    pub use crate::pipeline::{FeaturePipeline, PipelineConfig};

    // Training
    pub use crate::training::{
        GradientBoostingConfig, GradientBoostingRegressor, RegressionMetrics, TrainedModel,
        Trainer,
    };

    // Inference
    pub use crate::inference::{
        run_inference, run_training, InferenceReport, Prediction, PredictionSummary,
    };
}
