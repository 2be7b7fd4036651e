pub mod error;
pub mod progress;
pub mod report;
pub mod request;
pub mod run;

pub use error::RequestError;
pub use progress::ConsoleReporter;
pub use report::{ReportFormat, generate_report};
pub use request::{
    FetchRequest, expand_download_path, load_urls_from_file, parse_rate_limit, parse_url_line,
};
pub use run::{RunMode, RunSummary, execute_fetch, execute_fetch_with, reporter_for};
