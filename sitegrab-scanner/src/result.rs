use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    HttpError,
    IoError,
    ScopeError,
    SizeMismatch,
    MalformedUrl,
}

impl FetchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchStatus::Ok)
    }

    /// Skipped fetches never touched the network.
    pub fn is_skipped(&self) -> bool {
        matches!(self, FetchStatus::ScopeError | FetchStatus::MalformedUrl)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchStatus::Ok => "ok",
            FetchStatus::HttpError => "http error",
            FetchStatus::IoError => "io error",
            FetchStatus::ScopeError => "out of scope",
            FetchStatus::SizeMismatch => "size mismatch",
            FetchStatus::MalformedUrl => "malformed url",
        }
    }
}

/// Result of a single fetch attempt. Produced once, never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub url: String,
    pub path: Option<PathBuf>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub bytes_total: Option<u64>,
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn new(url: String) -> Self {
        let now = Local::now();
        Self {
            url,
            path: None,
            status_code: None,
            content_type: None,
            bytes_total: None,
            bytes_written: 0,
            elapsed: Duration::from_secs(0),
            started_at: now,
            finished_at: now,
            status: FetchStatus::Ok,
            error: None,
        }
    }

    pub fn with_error(url: String, status: FetchStatus, error: String) -> Self {
        let mut outcome = Self::new(url);
        outcome.status = status;
        outcome.error = Some(error);
        outcome
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Emitted once the response headers are in and the target file is known.
#[derive(Debug, Clone)]
pub struct FetchStart {
    pub url: String,
    pub path: PathBuf,
    pub status_code: u16,
    pub bytes_total: Option<u64>,
    pub started_at: DateTime<Local>,
}

/// Telemetry emitted after every chunk.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub url: String,
    pub bytes_written: u64,
    pub bytes_total: Option<u64>,
    pub elapsed: Duration,
    pub bytes_per_sec: u64,
    pub remaining: Option<Duration>,
}

impl FetchProgress {
    pub fn new(url: &str, bytes_written: u64, bytes_total: Option<u64>, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            (bytes_written as f64 / secs) as u64
        } else {
            0
        };
        // elapsed * (remaining / downloaded)
        let remaining = match bytes_total {
            Some(total) if bytes_written > 0 => {
                let left = total.saturating_sub(bytes_written) as f64;
                Some(elapsed.mul_f64(left / bytes_written as f64))
            }
            _ => None,
        };

        Self {
            url: url.to_string(),
            bytes_written,
            bytes_total,
            elapsed,
            bytes_per_sec,
            remaining,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        self.bytes_total
            .filter(|total| *total > 0)
            .map(|total| self.bytes_written as f64 / total as f64 * 100.0)
    }
}
