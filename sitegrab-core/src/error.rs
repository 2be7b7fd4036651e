use sitegrab_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the invocation itself. Anything here ends the run before
/// or instead of fetching; per-resource failures never surface as one.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Please provide a valid URL.")]
    MissingUrl,

    #[error("invalid rate limit {0:?}: expected a number with an optional k, M, GB or B suffix")]
    InvalidRateLimit(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot use URL list {}: {reason}", path.display())]
    UrlFile { path: PathBuf, reason: String },

    #[error("cannot create {}: {source}", path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: ScanError,
    },

    #[error("failed to set up HTTP client: {0}")]
    Client(#[source] ScanError),
}
