pub mod constants;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod links;
pub mod log;
pub mod rate;
pub mod reject;
pub mod reporter;
pub mod resolver;
pub mod result;
pub mod session;

pub use crawler::MirrorCrawler;
pub use error::ScanError;
pub use fetcher::ResourceFetcher;
pub use log::LogFileReporter;
pub use rate::{RateBudget, RateLimiter};
pub use reject::RejectList;
pub use reporter::{DisplayMode, FetchReporter, SharedReporter, SilentReporter};
pub use result::{FetchOutcome, FetchProgress, FetchStart, FetchStatus};
pub use session::{CrawlScope, CrawlSession, VisitedSet};
