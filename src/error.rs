use serde::Serialize;
use thiserror::Error;

/// Failure of a single stream. Carried alongside successful results in the
/// output mapping instead of aborting the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum StreamError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Join produced no rows: {0}")]
    JoinMismatch(String),

    #[error("Model fit failed: {0}")]
    Fit(String),

    #[error("Upstream dependency failed: {0}")]
    Dependency(String),

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema-critical input rejected: {0}")]
    SchemaCritical(StreamError),
}

pub type StreamResult<T> = Result<T, StreamError>;

pub type AppResult<T> = Result<T, ForecastError>;
