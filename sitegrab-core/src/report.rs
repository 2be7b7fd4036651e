// End-of-run summary rendering

use crate::run::{RunMode, RunSummary};
use colored::Colorize;
use indicatif::HumanBytes;
use serde::{Deserialize, Serialize};
use sitegrab_scanner::FetchOutcome;
use sitegrab_scanner::constants::TIMESTAMP_FORMAT;
use std::collections::BTreeMap;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_report(summary: &RunSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

pub fn generate_text_report(summary: &RunSummary) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Mode: {}\n", summary.mode.label()));
    report.push_str(&format!("  Downloaded: {}\n", summary.ok_count()));
    report.push_str(&format!("  Failed: {}\n", summary.failed_count()));
    report.push_str(&format!("  Skipped: {}\n", summary.skipped_count()));
    report.push_str(&format!(
        "  Total size: {} [~{}]\n",
        summary.total_bytes(),
        HumanBytes(summary.total_bytes())
    ));
    report.push_str(&format!(
        "  Elapsed: {:.2}s\n",
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    ));
    report.push_str(&format!(
        "  Finished at: {}\n",
        summary.finished_at.format(TIMESTAMP_FORMAT)
    ));

    if summary.mode == RunMode::Batch {
        let sizes: Vec<String> = summary
            .outcomes
            .iter()
            .map(|o| o.bytes_total.unwrap_or(o.bytes_written).to_string())
            .collect();
        report.push_str(&format!("  Content sizes: [{}]\n", sizes.join(", ")));
        report.push_str(&format!("  URLs: [{}]\n", summary.targets.join(", ")));
    }

    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    for (host, outcomes) in group_by_host(&summary.outcomes) {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} resources\n\n", outcomes.len()));

        for outcome in outcomes {
            report.push_str(&format!("  {} {}", status_cell(outcome), url_path(&outcome.url)));
            match outcome.error {
                None => {
                    if let Some(ref path) = outcome.path {
                        report.push_str(&format!(
                            " -> {} ({})",
                            path.display(),
                            HumanBytes(outcome.bytes_written)
                        ));
                    }
                }
                Some(ref error) => {
                    report.push_str(&format!(" {}", error.dimmed()));
                }
            }
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(summary: &RunSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "sitegrab",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "mode": summary.mode,
                "targets": summary.targets,
                "download_root": summary.download_root,
                "started_at": summary.started_at.to_rfc3339(),
                "finished_at": summary.finished_at.to_rfc3339(),
                "elapsed_seconds": summary.elapsed().num_milliseconds() as f64 / 1000.0
            },
            "summary": {
                "downloaded": summary.ok_count(),
                "failed": summary.failed_count(),
                "skipped": summary.skipped_count(),
                "total_bytes": summary.total_bytes()
            },
            "outcomes": summary.outcomes
        }
    });

    serde_json::to_string_pretty(&json_report)
}

fn group_by_host(outcomes: &[FetchOutcome]) -> BTreeMap<String, Vec<&FetchOutcome>> {
    let mut by_host: BTreeMap<String, Vec<&FetchOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        let host = Url::parse(&outcome.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        by_host.entry(host).or_default().push(outcome);
    }
    by_host
}

fn url_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| match u.query() {
            Some(query) => format!("{}?{}", u.path(), query),
            None => u.path().to_string(),
        })
        .unwrap_or_else(|_| url.to_string())
}

fn status_cell(outcome: &FetchOutcome) -> String {
    let text = match outcome.status_code {
        Some(code) => code.to_string(),
        None => "---".to_string(),
    };
    if outcome.is_ok() {
        text.green().to_string()
    } else if outcome.status.is_skipped() {
        text.bright_black().to_string()
    } else {
        match outcome.status_code {
            Some(400..=499) => text.yellow().to_string(),
            _ => text.red().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_path_keeps_query() {
        assert_eq!(url_path("https://example.com/a/b.png?v=2"), "/a/b.png?v=2");
        assert_eq!(url_path("https://example.com"), "/");
        assert_eq!(url_path("not a url"), "not a url");
    }

    #[test]
    fn test_group_by_host_is_sorted() {
        let outcomes = vec![
            FetchOutcome::new("https://b.example.com/x".to_string()),
            FetchOutcome::new("https://a.example.com/y".to_string()),
            FetchOutcome::new("https://b.example.com/z".to_string()),
        ];
        let grouped = group_by_host(&outcomes);
        let hosts: Vec<&String> = grouped.keys().collect();
        assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
        assert_eq!(grouped["b.example.com"].len(), 2);
    }
}
