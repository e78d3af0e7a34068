use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ScanError {
    /// True when the request gave up because the per-request ceiling elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Fetch(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
