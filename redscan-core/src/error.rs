use crate::report::ScanStatus;
use redscan_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Scanner error: {0}")]
    Scanner(#[from] ScanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid scan id: {0:?}")]
    InvalidScanId(String),

    #[error("Invalid scan state transition: {from} -> {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },
}

pub type Result<T> = std::result::Result<T, CoreError>;
