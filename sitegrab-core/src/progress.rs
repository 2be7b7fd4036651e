//! Terminal progress for interactive runs.

use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sitegrab_scanner::constants::TIMESTAMP_FORMAT;
use sitegrab_scanner::{FetchOutcome, FetchProgress, FetchReporter, FetchStart};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

const BAR_TEMPLATE: &str = "{bytes} / {total_bytes} [{bar:40.cyan/blue}] {percent}% - \
                            {bytes_per_sec} Time Remaining: {eta} - Time Elapsed: {elapsed}";
const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {bytes} - {bytes_per_sec} - Time Elapsed: {elapsed}";

/// Draws one bar per in-flight fetch, plus the init and completion lines
/// around it.
pub struct ConsoleReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    silent: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stdout(), false)
    }

    /// Tracks bars but prints nothing.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden(), true)
    }

    fn with_draw_target(target: ProgressDrawTarget, silent: bool) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
            silent,
        }
    }

    /// Number of transfers currently drawn.
    pub fn active(&self) -> usize {
        self.lock_bars().len()
    }

    fn lock_bars(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn line(&self, message: String) {
        if self.silent {
            return;
        }
        // Bars are not drawn when stdout is not a terminal; keep the text.
        if self.multi.is_hidden() {
            println!("{}", message);
            return;
        }
        if let Err(e) = self.multi.println(message) {
            debug!("progress output failed: {}", e);
        }
    }

    fn bar_for(&self, bytes_total: Option<u64>) -> ProgressBar {
        match bytes_total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        }
    }
}

impl FetchReporter for ConsoleReporter {
    fn on_start(&self, start: &FetchStart) {
        self.line(format!(
            "Start at: {}",
            start.started_at.format(TIMESTAMP_FORMAT)
        ));
        self.line(format!(
            "Sending request, awaiting response... status {}",
            status_text(start.status_code)
        ));
        if let Some(total) = start.bytes_total {
            self.line(format!("Content size: {} [~{}]", total, HumanBytes(total)));
        }
        self.line(format!("Saving to: ./{}", start.path.display()));

        let bar = self.multi.add(self.bar_for(start.bytes_total));
        self.lock_bars().insert(start.url.clone(), bar);
    }

    fn on_progress(&self, progress: &FetchProgress) {
        if let Some(bar) = self.lock_bars().get(&progress.url) {
            bar.set_position(progress.bytes_written);
        }
    }

    fn on_finish(&self, outcome: &FetchOutcome) {
        if let Some(bar) = self.lock_bars().remove(&outcome.url) {
            bar.finish();
        }

        match outcome.error {
            None => {
                self.line(format!("Download completed [{}]", outcome.url));
                self.line(format!(
                    "finished at: {}\n",
                    outcome.finished_at.format(TIMESTAMP_FORMAT)
                ));
            }
            // Off-scope links are expected during a mirror.
            Some(_) if outcome.status.is_skipped() => {}
            Some(ref error) => {
                self.line(format!("Error downloading {}: {}", outcome.url, error));
            }
        }
    }
}

fn status_text(code: u16) -> String {
    if code == 200 {
        "200 OK".to_string()
    } else {
        code.to_string()
    }
}
