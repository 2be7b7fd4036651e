use crate::result::{FetchOutcome, FetchProgress, FetchStart};
use std::sync::Arc;

/// How per-fetch telemetry is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Live progress on the terminal.
    Interactive,
    /// One block per fetch appended to the log file.
    LogFile,
    /// Nothing per fetch; outcomes are only aggregated.
    Batch,
}

/// Receives fetch telemetry. Implementations must tolerate concurrent
/// calls for different URLs.
pub trait FetchReporter: Send + Sync {
    fn on_start(&self, _start: &FetchStart) {}

    fn on_progress(&self, _progress: &FetchProgress) {}

    fn on_finish(&self, _outcome: &FetchOutcome) {}
}

pub type SharedReporter = Arc<dyn FetchReporter>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl FetchReporter for SilentReporter {}
