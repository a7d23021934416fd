//! Dataset file loading

use crate::error::{CleansetError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Missing-value tokens recognized in delimited text files
const NULL_TOKENS: [&str; 6] = ["", "NA", "N/A", "null", "NULL", "nan"];

/// Loader for the supported tabular file formats
pub struct DataLoader {
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Set the number of rows inspected for schema inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    /// Load a comma-separated file with a header row
    pub fn load_csv(&self, path: &str) -> Result<DataFrame> {
        self.load_csv_with_options(path, b',', true)
    }

    /// Load a delimited text file with specific options
    pub fn load_csv_with_options(
        &self,
        path: &str,
        delimiter: u8,
        has_header: bool,
    ) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        let null_values = NullValues::AllColumns(
            NULL_TOKENS.iter().map(|t| PlSmallStr::from_str(t)).collect(),
        );
        let parse_opts = CsvParseOptions::default()
            .with_separator(delimiter)
            .with_null_values(Some(null_values));

        let reader = CsvReadOptions::default()
            .with_has_header(has_header)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file);

        let df = reader
            .finish()
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        info!(rows = df.height(), cols = df.width(), path, "loaded delimited file");
        Ok(df)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &str) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        info!(rows = df.height(), cols = df.width(), path, "loaded parquet file");
        Ok(df)
    }

    /// Load a line-delimited JSON file
    pub fn load_json(&self, path: &str) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        let df = JsonReader::new(file)
            .finish()
            .map_err(|e| CleansetError::Load(format!("{path}: {e}")))?;

        info!(rows = df.height(), cols = df.width(), path, "loaded json file");
        Ok(df)
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: &str) -> Result<DataFrame> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => self.load_csv(path),
            "tsv" => self.load_csv_with_options(path, b'\t', true),
            "parquet" | "pq" => self.load_parquet(path),
            "json" | "jsonl" | "ndjson" => self.load_json(path),
            "xls" | "xlsx" => Err(CleansetError::Load(format!(
                "spreadsheet format .{ext} is not supported; export to csv or parquet"
            ))),
            other => Err(CleansetError::Load(format!(
                "unsupported file extension: .{other}"
            ))),
        }
    }
}
