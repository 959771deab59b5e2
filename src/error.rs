//! Error types for track analysis and batch runs
//!
//! Two layers:
//! - [`AnalysisError`]: anything that goes wrong while analyzing one track.
//!   These never escape the track boundary; the analyzer turns them into a
//!   failed outcome.
//! - [`BatchError`]: run-level problems (dataset, configuration, persistence,
//!   pool dispatch). Persistence errors halt the run.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while analyzing a single track
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Invalid input parameters
    InvalidInput(String),

    /// Audio decoding error
    DecodingError(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (non-finite values, degenerate statistics, etc.)
    NumericalError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<symphonia::core::errors::Error> for AnalysisError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AnalysisError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::DecodingError(err.to_string())
    }
}

/// Errors that can occur at the batch (run) level
#[derive(Debug)]
pub enum BatchError {
    /// Invalid batch configuration
    Config(String),

    /// Playlist dataset could not be read or parsed
    Dataset(String),

    /// Worker pool could not be created or driven for a chunk
    Dispatch(String),

    /// A checkpoint or the final artifact could not be written or read back
    Persistence {
        /// Artifact path
        path: PathBuf,
        /// Underlying error message
        message: String,
    },
}

impl BatchError {
    /// Build a persistence error for `path` from any displayable error
    pub fn persistence(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        BatchError::Persistence {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            BatchError::Dataset(msg) => write!(f, "Dataset error: {}", msg),
            BatchError::Dispatch(msg) => write!(f, "Chunk dispatch error: {}", msg),
            BatchError::Persistence { path, message } => {
                write!(f, "Persistence error ({}): {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for BatchError {}

impl From<rayon::ThreadPoolBuildError> for BatchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        BatchError::Dispatch(err.to_string())
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::Dataset(err.to_string())
    }
}
