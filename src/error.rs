//! typed failures for the fetch cycle and the history store

use std::path::PathBuf;

/// the weather provider could not produce a temperature
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("weather provider request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("weather provider returned status {0}")]
    Status(u16),
    #[error("malformed weather provider response: {0}")]
    MalformedBody(String),
}

/// the history file could not be read or written
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("history file {path} i/o error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history file {path} is not a valid reading array: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// why a scheduled fetch cycle was skipped
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}
