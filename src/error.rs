//! Error types for transaction analysis

use thiserror::Error;

/// Result type alias using `AnalysisError`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while ingesting or analysing transactions.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required column is missing or holds a malformed value.
    #[error("Invalid input schema in column '{column}': {reason}")]
    InvalidInputSchema {
        /// Offending column name.
        column: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No rows to fit against.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Rows exist but not enough of them for the requested model.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Analysis setting out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// CSV reader or writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background analysis task panicked or was cancelled.
    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

impl AnalysisError {
    /// Build an `InvalidInputSchema` error.
    pub fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInputSchema {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
