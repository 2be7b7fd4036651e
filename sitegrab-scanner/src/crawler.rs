use crate::constants::PAGE_SUFFIX;
use crate::error::{Result, ScanError};
use crate::fetcher::ResourceFetcher;
use crate::links::extract_links;
use crate::reject::RejectList;
use crate::resolver::{resolve, split_target};
use crate::session::CrawlSession;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A reference found on a page, after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Discovered {
    Page(Url),
    Asset(Url),
}

/// Recursive same-domain mirror.
///
/// Pages (paths ending in `.html`) are saved and searched for further
/// links; everything else is saved as a leaf asset. Files land under
/// `<download_root>/<host>/<remote directories>/<file name>`.
///
/// There is no depth bound. The visited set guarantees termination for any
/// site with finitely many distinct URLs; a server that invents endless
/// query-string variants will keep the crawl going.
pub struct MirrorCrawler {
    fetcher: ResourceFetcher,
    download_root: PathBuf,
    workers: usize,
    reject: RejectList,
    permits: Arc<Semaphore>,
}

impl MirrorCrawler {
    pub fn new(fetcher: ResourceFetcher, download_root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            download_root: download_root.into(),
            workers: 1,
            reject: RejectList::default(),
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Upper bound on fetches in flight at once. `1` gives a strictly
    /// sequential depth-first crawl.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.permits = Arc::new(Semaphore::new(self.workers));
        self
    }

    pub fn with_reject(mut self, reject: RejectList) -> Self {
        self.reject = reject;
        self
    }

    /// Directory the given session's files are written under.
    pub fn mirror_root(&self, session: &CrawlSession) -> PathBuf {
        self.download_root.join(session.scope().host())
    }

    /// Mirror everything reachable from `seed` within its host.
    ///
    /// Only malformed seeds and an uncreatable mirror root are errors;
    /// per-resource failures end up in the session's outcomes.
    pub async fn mirror(&self, seed: &str) -> Result<CrawlSession> {
        let seed_url =
            Url::parse(seed).map_err(|e| ScanError::MalformedUrl(format!("{}: {}", seed, e)))?;
        let session = CrawlSession::new(&seed_url)?;

        let root = self.mirror_root(&session);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ScanError::io(&root, e))?;

        info!("Mirroring {} into {}", seed_url, root.display());
        self.crawl(&session, seed_url).await;

        let outcomes = session.outcomes().await;
        info!(
            "Mirror complete. {} fetches, {} visited URLs",
            outcomes.len(),
            session.visited().len().await
        );
        Ok(session)
    }

    /// Visit one page. A URL outside the session's scope, or one already
    /// visited, is a no-op and makes no request.
    pub fn crawl<'a>(&'a self, session: &'a CrawlSession, url: Url) -> BoxFuture<'a, ()> {
        async move {
            if !session.scope().contains(&url) {
                debug!("Out of scope, skipping {}", url);
                return;
            }
            if self.reject.matches(&url) {
                debug!("Rejected by suffix, skipping {}", url);
                return;
            }
            if !session.visited().mark(&url).await {
                debug!("Already visited {}", url);
                return;
            }

            let body = self.save_page(session, &url).await;
            let Some(body) = body else {
                return;
            };

            let children = discover(&url, &body);
            debug!("{} references on {}", children.len(), url);

            futures::stream::iter(children)
                .for_each_concurrent(self.workers, |child| self.visit(session, child))
                .await;
        }
        .boxed()
    }

    fn visit<'a>(&'a self, session: &'a CrawlSession, child: Discovered) -> BoxFuture<'a, ()> {
        match child {
            Discovered::Page(url) => self.crawl(session, url),
            Discovered::Asset(url) => self.fetch_asset(session, url).boxed(),
        }
    }

    #[instrument(level = "debug", skip(self, session, url), fields(url = %url))]
    async fn save_page(&self, session: &CrawlSession, url: &Url) -> Option<String> {
        let target = split_target(url);
        let dir = self.target_dir(session, &target.output_dir);

        let (outcome, body) = {
            let _permit = self.permits.acquire().await.ok();
            self.fetcher
                .fetch_page(session.scope(), url, &dir, &target.file_name)
                .await
        };

        if let Some(ref error) = outcome.error {
            warn!("Error downloading {}: {}", url, error);
        }
        session.record(outcome).await;
        body
    }

    async fn fetch_asset(&self, session: &CrawlSession, url: Url) {
        if self.reject.matches(&url) {
            debug!("Rejected by suffix, skipping {}", url);
            return;
        }
        // Assets share the visited set so a file linked from many pages is
        // fetched once.
        if !session.visited().mark(&url).await {
            return;
        }

        let target = split_target(&url);
        let dir = self.target_dir(session, &target.output_dir);

        let outcome = {
            let _permit = self.permits.acquire().await.ok();
            self.fetcher
                .fetch(session.scope(), &url, &dir, &target.file_name)
                .await
        };

        if let Some(ref error) = outcome.error {
            if outcome.status.is_skipped() {
                debug!("Skipped {}: {}", url, error);
            } else {
                warn!("Error downloading {}: {}", url, error);
            }
        }
        session.record(outcome).await;
    }

    fn target_dir(&self, session: &CrawlSession, output_dir: &str) -> PathBuf {
        let mut dir = self.mirror_root(session);
        for segment in output_dir.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }
}

fn discover(page: &Url, body: &str) -> Vec<Discovered> {
    extract_links(body)
        .into_iter()
        .filter_map(|reference| match resolve(page.as_str(), &reference) {
            Ok(mut url) => {
                url.set_fragment(None);
                if url.scheme() != "http" && url.scheme() != "https" {
                    debug!("Ignoring non-http reference {}", url);
                    return None;
                }
                if url.path().ends_with(PAGE_SUFFIX) {
                    Some(Discovered::Page(url))
                } else {
                    Some(Discovered::Asset(url))
                }
            }
            Err(e) => {
                debug!("Skipping reference {:?} on {}: {}", reference, page, e);
                None
            }
        })
        .collect()
}
