//! Error types for the cleanset library

use thiserror::Error;

/// Result type alias for cleanset operations
pub type Result<T> = std::result::Result<T, CleansetError>;

/// Main error type for the cleanset library
#[derive(Error, Debug)]
pub enum CleansetError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Insufficient data: {rows} usable rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("Transform failed at operation {index} ({column}): {message}")]
    Transform {
        index: usize,
        column: String,
        message: String,
    },

    #[error("Pipeline mismatch: {0}")]
    PipelineMismatch(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Not fitted")]
    NotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for CleansetError {
    fn from(err: polars::error::PolarsError) -> Self {
        CleansetError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for CleansetError {
    fn from(err: serde_json::Error) -> Self {
        CleansetError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CleansetError::ColumnNotFound("price".to_string());
        assert_eq!(err.to_string(), "Column not found: price");
    }

    #[test]
    fn test_transform_error_carries_context() {
        let err = CleansetError::Transform {
            index: 2,
            column: "color".to_string(),
            message: "bad value".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("operation 2"));
        assert!(text.contains("color"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CleansetError = io_err.into();
        assert!(matches!(err, CleansetError::Io(_)));
    }
}
