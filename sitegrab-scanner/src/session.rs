use crate::error::{Result, ScanError};
use crate::resolver::{canonical, scope_of};
use crate::result::FetchOutcome;
use std::collections::HashSet;
use tokio::sync::Mutex;
use url::Url;

/// The single host a crawl may fetch from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope(String);

impl CrawlScope {
    pub fn from_url(url: &Url) -> Result<Self> {
        scope_of(url)
            .map(CrawlScope)
            .ok_or_else(|| ScanError::MalformedUrl(format!("{} has no host", url)))
    }

    pub fn host(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, url: &Url) -> bool {
        scope_of(url).as_deref() == Some(self.0.as_str())
    }
}

/// URLs already claimed by a crawl. Only ever grows.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and mark in one step. Returns `true` only for the caller that
    /// inserted the URL.
    pub async fn mark(&self, url: &Url) -> bool {
        self.urls.lock().await.insert(canonical(url))
    }

    pub async fn contains(&self, url: &Url) -> bool {
        self.urls.lock().await.contains(&canonical(url))
    }

    pub async fn len(&self) -> usize {
        self.urls.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.urls.lock().await.is_empty()
    }
}

/// State owned by one crawl invocation: its scope, visited set and the
/// outcomes collected so far. Nothing here is shared between crawls.
#[derive(Debug)]
pub struct CrawlSession {
    scope: CrawlScope,
    visited: VisitedSet,
    outcomes: Mutex<Vec<FetchOutcome>>,
}

impl CrawlSession {
    pub fn new(seed: &Url) -> Result<Self> {
        Ok(Self {
            scope: CrawlScope::from_url(seed)?,
            visited: VisitedSet::new(),
            outcomes: Mutex::new(Vec::new()),
        })
    }

    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub async fn record(&self, outcome: FetchOutcome) {
        self.outcomes.lock().await.push(outcome);
    }

    pub async fn outcomes(&self) -> Vec<FetchOutcome> {
        self.outcomes.lock().await.clone()
    }
}
