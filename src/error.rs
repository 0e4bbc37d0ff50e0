use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading the video dataset. Loading is all-or-nothing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("row {row}, column '{column}': {reason}")]
    InvalidValue {
        row: usize,
        column: String,
        reason: String,
    },
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

/// A filter that cannot be applied to the table it was given.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("range on '{column}' is inverted: {min} > {max}")]
    InvertedRange {
        column: String,
        min: String,
        max: String,
    },
    #[error("value {value} does not fit column '{column}' ({expected})")]
    TypeMismatch {
        column: String,
        value: String,
        expected: &'static str,
    },
}

/// Failure while writing a table out.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported output extension: .{0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}
