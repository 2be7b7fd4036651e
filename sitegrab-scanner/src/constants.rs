//! Fixed values shared by the fetcher and the crawler.

/// Client identity sent with every request.
pub const USER_AGENT: &str = concat!("sitegrab/", env!("CARGO_PKG_VERSION"));

/// Bytes written (and rate-checked) per step of the streaming loop.
pub const CHUNK_SIZE: usize = 1024;

/// Name of the log file written in log-to-file mode.
pub const LOG_FILE_NAME: &str = "wget-log";

/// File name used when a URL path ends in `/` or is empty.
pub const DEFAULT_FILE_NAME: &str = "index.html";

/// Links ending in this suffix are treated as pages and crawled recursively.
pub const PAGE_SUFFIX: &str = ".html";

pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Redirect hops followed before the last 3xx response is reported as-is.
pub const MAX_REDIRECTS: usize = 5;

/// Timestamp layout used in progress lines and the log file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
