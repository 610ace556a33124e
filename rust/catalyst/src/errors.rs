use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataReadingError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Malformed data line {line_number}: '{line}'")]
    MalformedLine { line_number: usize, line: String },

    #[error("No scan information found in {0}")]
    NoScanInformation(PathBuf),

    #[error("No m/z scan boundaries found in {0}")]
    NoMzBounds(PathBuf),
}

#[derive(Debug, Error)]
pub enum DataProcessingError {
    #[error("No data for given mass/charge value {mz} (file range {min_mz}..{max_mz})")]
    NoDataForMz { mz: f64, min_mz: f64, max_mz: f64 },

    #[error("No data in requested region {start}..{end} (file range {min_mz}..{max_mz})")]
    NoDataInRegion {
        start: f64,
        end: f64,
        min_mz: f64,
        max_mz: f64,
    },

    #[error("Expected slices of the same length ({expected} != {other}) in {context}")]
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },

    #[error("Expected non-empty data in {context}")]
    ExpectedNonEmptyData { context: String },

    #[error("Invalid smoothing parameters: window={window}, polyorder={polyorder}, length={length}")]
    InvalidSmoothing {
        window: usize,
        polyorder: usize,
        length: usize,
    },

    #[error("Reference curve has not been set")]
    MissingReference,

    #[error("Worker pool could not be built: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Cache entry could not be encoded: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Cache entry could not be decoded: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Cache manifest is corrupt: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalystError {
    #[error(transparent)]
    DataReading(#[from] DataReadingError),

    #[error(transparent)]
    DataProcessing(#[from] DataProcessingError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, CatalystError>;
