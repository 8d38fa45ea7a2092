use std::path::PathBuf;
use thiserror::Error;

use crate::models::MaintenanceStep;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("root folder does not exist or is not a directory: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("store unavailable at {}: {source}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("collection `{collection}` does not exist in {}", .path.display())]
    CollectionNotFound { path: PathBuf, collection: String },

    #[error("batch write failed, batch rolled back: {0}")]
    WriteFailed(#[source] rusqlite::Error),

    #[error("index maintenance step `{step}` failed: {source}")]
    MaintenanceFailed {
        step: MaintenanceStep,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A single file could not be opened or read. Never aborts a run.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct FileReadFailure {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("full-text query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
