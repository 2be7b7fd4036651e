use crate::result::FetchStatus;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("domain mismatch: {host} != {scope}")]
    Scope { host: String, scope: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("size mismatch for {url}: declared {declared} bytes, received {received}")]
    SizeMismatch {
        url: String,
        declared: u64,
        received: u64,
    },
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The outcome class this error is reported under.
    pub fn status(&self) -> FetchStatus {
        match self {
            ScanError::Scope { .. } => FetchStatus::ScopeError,
            ScanError::HttpStatus { .. } | ScanError::Network(_) => FetchStatus::HttpError,
            ScanError::Io { .. } => FetchStatus::IoError,
            ScanError::SizeMismatch { .. } => FetchStatus::SizeMismatch,
            ScanError::MalformedUrl(_) => FetchStatus::MalformedUrl,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
