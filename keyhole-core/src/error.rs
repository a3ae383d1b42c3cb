use thiserror::Error;

/// Failures surfaced by the knowledge store. A missing record is never an
/// error; these cover real I/O trouble and on-disk corruption only.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record for domain '{domain}': {source}")]
    Corrupt {
        domain: String,
        source: serde_json::Error,
    },
}

/// Failures surfaced by the discovery engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
