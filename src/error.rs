use thiserror::Error;

/// Everything the pipeline can fail with.
///
/// Variants fall into three classes: per-period (`Network`, `Payload`, `Schema`),
/// per-line/per-record (`MalformedRecord`, `Validation`), and fatal (the rest).
#[derive(Error, Debug)]
pub enum Error {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("malformed payload from {url}: {reason}")]
    Payload { url: String, reason: String },

    #[error("expected column `{column}` missing (found: {found:?})")]
    Schema { column: String, found: Vec<String> },

    #[error("gazetteer format error: {0}")]
    Format(String),

    #[error("malformed gazetteer line {line_no}: {line:?}")]
    MalformedRecord { line_no: usize, line: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the failure only invalidates the current period and the run
    /// may continue with the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. }
                | Error::Payload { .. }
                | Error::Schema { .. }
                | Error::MalformedRecord { .. }
                | Error::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
