use crate::error::RequestError;
use crate::progress::ConsoleReporter;
use crate::request::{FetchRequest, load_urls_from_file, parse_target_url};
use chrono::{DateTime, Local};
use serde::Serialize;
use sitegrab_scanner::resolver::split_target;
use sitegrab_scanner::{
    CrawlSession, DisplayMode, FetchOutcome, FetchStatus, LogFileReporter, MirrorCrawler,
    RateBudget, ResourceFetcher, ScanError, SharedReporter, SilentReporter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Single,
    Batch,
    Mirror,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Single => "single",
            RunMode::Batch => "batch",
            RunMode::Mirror => "mirror",
        }
    }
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub targets: Vec<String>,
    pub download_root: PathBuf,
    pub outcomes: Vec<FetchOutcome>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunSummary {
    pub fn ok_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok() && !o.status.is_skipped())
            .count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_written).sum()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Pick the reporter matching the request's display mode. In log mode the
/// log file is truncated here, once per run.
pub fn reporter_for(request: &FetchRequest) -> Result<SharedReporter, RequestError> {
    let reporter: SharedReporter = match request.display_mode() {
        DisplayMode::Interactive => Arc::new(ConsoleReporter::new()),
        DisplayMode::LogFile => {
            let path = request.log_path();
            let log = LogFileReporter::create(&path)
                .map_err(|source| RequestError::OutputRoot { path, source })?;
            Arc::new(log)
        }
        DisplayMode::Batch => Arc::new(SilentReporter),
    };
    Ok(reporter)
}

/// Run the request with the reporter its display mode calls for.
pub async fn execute_fetch(request: &FetchRequest) -> Result<RunSummary, RequestError> {
    let reporter = reporter_for(request)?;
    execute_fetch_with(request, reporter).await
}

/// Run the request, sending per-fetch telemetry to `reporter`.
///
/// Only invocation problems are errors. Failed downloads are part of the
/// returned summary.
pub async fn execute_fetch_with(
    request: &FetchRequest,
    reporter: SharedReporter,
) -> Result<RunSummary, RequestError> {
    request.validate()?;

    let fetcher =
        ResourceFetcher::with_tls_verification(RateBudget::new(request.rate_limit), !request.insecure)
            .map_err(RequestError::Client)?
            .with_reporter(reporter);

    if request.insecure {
        warn!("TLS certificate verification is disabled");
    }

    let started_at = Local::now();
    let (mode, targets, outcomes) = if request.mirror {
        let outcomes = run_mirror(request, fetcher).await?;
        (RunMode::Mirror, vec![request.seed_url.clone()], outcomes)
    } else if let Some(ref url_file) = request.url_file {
        let targets = load_urls_from_file(url_file)?;
        let outcomes = run_singles(request, &fetcher, &targets).await?;
        (RunMode::Batch, targets, outcomes)
    } else {
        let targets = vec![request.seed_url.trim().to_string()];
        let outcomes = run_singles(request, &fetcher, &targets).await?;
        (RunMode::Single, targets, outcomes)
    };

    let summary = RunSummary {
        mode,
        targets,
        download_root: request.download_path.clone(),
        outcomes,
        started_at,
        finished_at: Local::now(),
    };
    info!(
        ok = summary.ok_count(),
        failed = summary.failed_count(),
        skipped = summary.skipped_count(),
        "run finished"
    );
    Ok(summary)
}

async fn run_mirror(
    request: &FetchRequest,
    fetcher: ResourceFetcher,
) -> Result<Vec<FetchOutcome>, RequestError> {
    let seed = parse_target_url(&request.seed_url)?;
    let crawler = MirrorCrawler::new(fetcher, &request.download_path)
        .with_workers(request.workers)
        .with_reject(request.reject.clone());

    let session = crawler.mirror(seed.as_str()).await.map_err(|e| match e {
        ScanError::Io { path, source } => RequestError::OutputRoot {
            path: path.clone(),
            source: ScanError::Io { path, source },
        },
        other => RequestError::InvalidUrl {
            url: request.seed_url.clone(),
            reason: other.to_string(),
        },
    })?;

    Ok(session.outcomes().await)
}

/// Fetch each target as a standalone resource into the download path.
async fn run_singles(
    request: &FetchRequest,
    fetcher: &ResourceFetcher,
    targets: &[String],
) -> Result<Vec<FetchOutcome>, RequestError> {
    let root = &request.download_path;
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| RequestError::OutputRoot {
            path: root.clone(),
            source: ScanError::io(root, e),
        })?;

    let batch = targets.len() > 1 || request.url_file.is_some();
    let mut outcomes = Vec::with_capacity(targets.len());

    for target in targets {
        let url = match parse_target_url(target) {
            Ok(url) => url,
            Err(e) if batch => {
                warn!("{}", e);
                outcomes.push(FetchOutcome::with_error(
                    target.clone(),
                    FetchStatus::MalformedUrl,
                    e.to_string(),
                ));
                continue;
            }
            Err(e) => return Err(e),
        };

        if request.reject.matches(&url) {
            warn!("Skipping {}: rejected suffix", url);
            continue;
        }

        // Each resource gets its own session scoped to its own host.
        let session = CrawlSession::new(&url).map_err(|e| RequestError::InvalidUrl {
            url: target.clone(),
            reason: e.to_string(),
        })?;

        let file_name = match request.output_file {
            Some(ref name) if !batch => name.clone(),
            _ => split_target(&url).file_name,
        };

        let outcome = fetcher.fetch(session.scope(), &url, root, &file_name).await;
        if let Some(ref error) = outcome.error {
            warn!("Error downloading {}: {}", url, error);
        }
        session.record(outcome).await;
        outcomes.extend(session.outcomes().await);
    }

    Ok(outcomes)
}
