use clap::ArgMatches;
use colored::Colorize;
use sitegrab_core::report::{ReportFormat, generate_report};
use sitegrab_core::{
    FetchRequest, RequestError, RunMode, expand_download_path, execute_fetch, parse_rate_limit,
};
use sitegrab_scanner::{DisplayMode, RejectList};
use std::path::PathBuf;
use tracing::debug;

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Turn parsed arguments into a validated request.
pub fn build_request(matches: &ArgMatches) -> Result<FetchRequest, RequestError> {
    let seed_url = matches
        .get_one::<String>("URL")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let url_file = matches.get_one::<PathBuf>("input-file").cloned();

    if seed_url.is_empty() && url_file.is_none() {
        return Err(RequestError::MissingUrl);
    }

    let rate_limit = parse_rate_limit(
        matches
            .get_one::<String>("rate-limit")
            .map(String::as_str)
            .unwrap_or(""),
    )?;

    let download_path = expand_download_path(
        matches
            .get_one::<String>("directory-prefix")
            .map(String::as_str)
            .unwrap_or("."),
    );

    let reject = matches
        .get_one::<String>("reject")
        .map(|list| RejectList::parse(list))
        .unwrap_or_default();

    let request = FetchRequest {
        seed_url,
        output_file: matches.get_one::<String>("output-document").cloned(),
        download_path,
        mirror: matches.get_flag("mirror"),
        rate_limit,
        log_to_file: matches.get_flag("background"),
        url_file,
        reject,
        workers: matches.get_one::<usize>("threads").copied().unwrap_or(1),
        insecure: matches.get_flag("no-check-certificate"),
        quiet: matches.get_flag("quiet"),
    };

    request.validate()?;
    Ok(request)
}

pub fn report_format(matches: &ArgMatches) -> ReportFormat {
    matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::parse(f))
        .unwrap_or(ReportFormat::Text)
}

/// Run one invocation end to end.
pub async fn handle_fetch(matches: &ArgMatches) -> anyhow::Result<()> {
    let request = build_request(matches)?;
    let format = report_format(matches);
    let display = request.display_mode();
    debug!(?request, display = ?request.display_mode(), "request built");

    if display == DisplayMode::LogFile {
        println!(
            "Output will be written to ‘{}’.",
            request.log_path().display()
        );
    }
    if request.insecure {
        println!(
            "{} TLS certificate verification is disabled",
            "⚠".yellow().bold()
        );
    }

    let summary = execute_fetch(&request).await?;

    // A lone interactive download already showed everything on its bar.
    let show_report = display != DisplayMode::LogFile
        && (summary.mode != RunMode::Single
            || display == DisplayMode::Batch
            || format == ReportFormat::Json);
    if show_report {
        println!("{}", generate_report(&summary, format)?);
    }

    if summary.failed_count() > 0 && display != DisplayMode::Batch {
        println!(
            "{} {} of {} downloads failed",
            "✗".red().bold(),
            summary.failed_count(),
            summary.outcomes.len()
        );
    }

    Ok(())
}
