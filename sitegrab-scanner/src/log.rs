//! Log-to-file telemetry.
//!
//! The file is truncated once when the reporter is created; every finished
//! fetch then appends a single block, written while holding a lock so that
//! concurrent fetches never interleave or overwrite each other.

use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{Result, ScanError};
use crate::reporter::FetchReporter;
use crate::result::FetchOutcome;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct LogFileReporter {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogFileReporter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| ScanError::io(&path, e))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, block: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(block.as_bytes())?;
        file.flush()
    }
}

impl FetchReporter for LogFileReporter {
    fn on_finish(&self, outcome: &FetchOutcome) {
        if let Err(e) = self.append(&render_block(outcome)) {
            warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }
}

/// The init and completion lines for one fetch, as written to the log.
pub fn render_block(outcome: &FetchOutcome) -> String {
    let mut block = String::new();
    block.push_str(&format!(
        "Start at: {}\n",
        outcome.started_at.format(TIMESTAMP_FORMAT)
    ));
    block.push_str("Sending request, awaiting response... ");
    match outcome.status_code {
        Some(200) => block.push_str("status 200 OK\n"),
        Some(code) => block.push_str(&format!("status {}\n", code)),
        None => block.push_str("no response\n"),
    }
    if let Some(total) = outcome.bytes_total {
        block.push_str(&format!("Content size: {}\n", total));
    }
    if let Some(ref path) = outcome.path {
        block.push_str(&format!("Saving to: ./{}\n", path.display()));
    }
    block.push('\n');

    match outcome.error {
        None => {
            block.push_str(&format!("Download completed [{}]\n", outcome.url));
        }
        Some(ref error) => {
            block.push_str(&format!("Error downloading {}: {}\n", outcome.url, error));
        }
    }
    block.push_str(&format!(
        "finished at: {}\n\n",
        outcome.finished_at.format(TIMESTAMP_FORMAT)
    ));
    block
}
