//! Everything a run needs to know, captured from the command line.

use crate::error::RequestError;
use sitegrab_scanner::constants::LOG_FILE_NAME;
use sitegrab_scanner::{DisplayMode, RejectList};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Required unless `url_file` is set.
    pub seed_url: String,
    /// Overrides the file name derived from the URL (single fetch only).
    pub output_file: Option<String>,
    pub download_path: PathBuf,
    pub mirror: bool,
    /// Bytes per second, `0` for no limit.
    pub rate_limit: u64,
    pub log_to_file: bool,
    pub url_file: Option<PathBuf>,
    pub reject: RejectList,
    pub workers: usize,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    pub quiet: bool,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            output_file: None,
            download_path: PathBuf::from("."),
            mirror: false,
            rate_limit: 0,
            log_to_file: false,
            url_file: None,
            reject: RejectList::default(),
            workers: 1,
            insecure: false,
            quiet: false,
        }
    }
}

impl FetchRequest {
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            ..Self::default()
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        if self.log_to_file {
            DisplayMode::LogFile
        } else if self.url_file.is_some() || self.quiet {
            DisplayMode::Batch
        } else {
            DisplayMode::Interactive
        }
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(LOG_FILE_NAME)
    }

    /// Reject invocations that cannot fetch anything.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.url_file.is_some() {
            return Ok(());
        }
        if self.seed_url.trim().is_empty() {
            return Err(RequestError::MissingUrl);
        }
        parse_target_url(&self.seed_url).map(|_| ())
    }
}

/// Parse a URL given on the command line. Only http and https are fetched.
pub fn parse_target_url(raw: &str) -> Result<Url, RequestError> {
    let url = Url::parse(raw.trim()).map_err(|e| RequestError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        "http" | "https" => Err(RequestError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        }),
        other => Err(RequestError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}

/// Convert a rate literal such as `200k`, `1.5M`, `2GB` or `512B` to bytes
/// per second. An empty string means no limit.
pub fn parse_rate_limit(literal: &str) -> Result<u64, RequestError> {
    let literal = literal.trim();
    if literal.is_empty() {
        return Ok(0);
    }

    let invalid = || RequestError::InvalidRateLimit(literal.to_string());

    let split = literal
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(literal.len());
    let (number, unit) = literal.split_at(split);

    if number.is_empty() {
        return Err(invalid());
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => KIB,
        "m" | "mb" => MIB,
        "g" | "gb" => GIB,
        _ => return Err(invalid()),
    };

    Ok((value * multiplier) as u64)
}

/// Expand a leading `~` in the download path.
pub fn expand_download_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Load and parse URLs from a newline-delimited file.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, RequestError> {
    let content = fs::read_to_string(path).map_err(|e| RequestError::UrlFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(RequestError::UrlFile {
            path: path.to_path_buf(),
            reason: "no valid URLs found".to_string(),
        });
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding `http://` when no scheme is given.
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = parse_target_url(line) {
        return Some(url.to_string());
    }

    if !line.contains("://")
        && let Ok(url) = parse_target_url(&format!("http://{}", line))
    {
        return Some(url.to_string());
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}
