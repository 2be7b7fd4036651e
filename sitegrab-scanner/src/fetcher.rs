use crate::constants::{CHUNK_SIZE, CONNECT_TIMEOUT_SECS, MAX_REDIRECTS, USER_AGENT};
use crate::error::{Result, ScanError};
use crate::rate::{RateBudget, RateLimiter};
use crate::reporter::{SharedReporter, SilentReporter};
use crate::result::{FetchOutcome, FetchProgress, FetchStart, FetchStatus};
use crate::session::CrawlScope;
use chrono::Local;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

/// Streams single resources to disk under a rate budget.
#[derive(Clone)]
pub struct ResourceFetcher {
    client: Client,
    limiter: RateLimiter,
    reporter: SharedReporter,
}

impl ResourceFetcher {
    pub fn new(budget: RateBudget) -> Result<Self> {
        Self::with_tls_verification(budget, true)
    }

    /// `verify_certificates = false` accepts any server certificate. Only
    /// reachable through an explicit opt-in flag.
    pub fn with_tls_verification(budget: RateBudget, verify_certificates: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(!verify_certificates)
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(budget),
            reporter: Arc::new(SilentReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Download `url` into `output_dir/file_name`.
    ///
    /// Never fails outright: the first error stops the transfer and is
    /// folded into the returned outcome. A file that was already being
    /// written when the error hit is left on disk as-is.
    pub async fn fetch(
        &self,
        scope: &CrawlScope,
        url: &Url,
        output_dir: &Path,
        file_name: &str,
    ) -> FetchOutcome {
        self.fetch_inner(scope, url, output_dir, file_name, false).await.0
    }

    /// Like [`fetch`](Self::fetch), but also hands back the body when the
    /// response is an HTML document so the caller can look for links.
    pub async fn fetch_page(
        &self,
        scope: &CrawlScope,
        url: &Url,
        output_dir: &Path,
        file_name: &str,
    ) -> (FetchOutcome, Option<String>) {
        let (outcome, body) = self.fetch_inner(scope, url, output_dir, file_name, true).await;
        let body = body.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        (outcome, body)
    }

    #[instrument(level = "debug", skip(self, scope, url, output_dir), fields(url = %url))]
    async fn fetch_inner(
        &self,
        scope: &CrawlScope,
        url: &Url,
        output_dir: &Path,
        file_name: &str,
        capture_html: bool,
    ) -> (FetchOutcome, Option<Vec<u8>>) {
        let mut outcome = FetchOutcome::new(url.to_string());
        let started = Instant::now();

        let result = self
            .transfer(scope, url, output_dir, file_name, capture_html, started, &mut outcome)
            .await;

        outcome.elapsed = started.elapsed();
        outcome.finished_at = Local::now();

        let body = match result {
            Ok(body) => {
                outcome.status = FetchStatus::Ok;
                info!(
                    bytes = outcome.bytes_written,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "download complete"
                );
                body
            }
            Err(e) => {
                debug!("fetch failed: {}", e);
                outcome.status = e.status();
                outcome.error = Some(e.to_string());
                None
            }
        };

        self.reporter.on_finish(&outcome);
        (outcome, body)
    }

    #[allow(clippy::too_many_arguments)]
    async fn transfer(
        &self,
        scope: &CrawlScope,
        url: &Url,
        output_dir: &Path,
        file_name: &str,
        capture_html: bool,
        started: Instant,
        outcome: &mut FetchOutcome,
    ) -> Result<Option<Vec<u8>>> {
        let response = self.send_in_scope(scope, url).await?;
        let status = response.status();
        outcome.status_code = Some(status.as_u16());
        outcome.content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Checked before anything touches the disk.
        if status != StatusCode::OK {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes_total = response.content_length();
        outcome.bytes_total = bytes_total;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ScanError::io(output_dir, e))?;

        let file_path = output_dir.join(file_name);
        let file = File::create(&file_path)
            .await
            .map_err(|e| ScanError::io(&file_path, e))?;
        outcome.path = Some(file_path.clone());

        self.reporter.on_start(&FetchStart {
            url: url.to_string(),
            path: file_path.clone(),
            status_code: status.as_u16(),
            bytes_total,
            started_at: outcome.started_at,
        });

        let mut captured = (capture_html && is_html(outcome.content_type.as_deref(), file_name))
            .then(Vec::new);
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        'stream: while let Some(next) = stream.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                // The body ended short of its declared length.
                Err(e) if bytes_total.is_some_and(|declared| written < declared) => {
                    debug!("stream cut short after {} bytes: {}", written, e);
                    break 'stream;
                }
                Err(e) => return Err(e.into()),
            };

            for chunk in bytes.chunks(CHUNK_SIZE) {
                let chunk = match bytes_total {
                    Some(total) => {
                        let left = total.saturating_sub(written) as usize;
                        &chunk[..chunk.len().min(left)]
                    }
                    None => chunk,
                };
                if chunk.is_empty() {
                    break 'stream;
                }

                writer
                    .write_all(chunk)
                    .await
                    .map_err(|e| ScanError::io(&file_path, e))?;
                if let Some(buffer) = captured.as_mut() {
                    buffer.extend_from_slice(chunk);
                }

                written += chunk.len() as u64;
                outcome.bytes_written = written;

                let elapsed = started.elapsed();
                self.reporter.on_progress(&FetchProgress::new(
                    url.as_str(),
                    written,
                    bytes_total,
                    elapsed,
                ));
                self.limiter.throttle(written, elapsed, chunk.len()).await;

                // A server that declared its size may never signal a clean end.
                if bytes_total == Some(written) {
                    break 'stream;
                }
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| ScanError::io(&file_path, e))?;

        match bytes_total {
            Some(declared) if declared != written => {
                return Err(ScanError::SizeMismatch {
                    url: url.to_string(),
                    declared,
                    received: written,
                });
            }
            Some(_) => {}
            None => outcome.bytes_total = Some(written),
        }

        Ok(captured)
    }

    /// GET `url`, following redirects by hand so that every hop, not just
    /// the first, has to stay inside `scope`.
    async fn send_in_scope(&self, scope: &CrawlScope, url: &Url) -> Result<Response> {
        check_scope(scope, url)?;
        let mut current = url.clone();

        for _ in 0..MAX_REDIRECTS {
            let response = self.client.get(current.clone()).send().await?;
            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok(response);
            };

            let next = current
                .join(location)
                .map_err(|e| ScanError::MalformedUrl(format!("{}: {}", location, e)))?;
            check_scope(scope, &next)?;
            debug!(from = %current, to = %next, "following redirect");
            current = next;
        }

        Ok(self.client.get(current).send().await?)
    }
}

fn check_scope(scope: &CrawlScope, url: &Url) -> Result<()> {
    if scope.contains(url) {
        return Ok(());
    }
    Err(ScanError::Scope {
        host: url.host_str().unwrap_or("unknown").to_string(),
        scope: scope.host().to_string(),
    })
}

fn is_html(content_type: Option<&str>, file_name: &str) -> bool {
    match content_type {
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        }
        None => {
            let name = file_name.to_ascii_lowercase();
            name.ends_with(".html") || name.ends_with(".htm")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn scope_for(server: &MockServer) -> CrawlScope {
        CrawlScope::from_url(&Url::parse(&server.uri()).unwrap()).unwrap()
    }

    fn url_on(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    /// One-shot HTTP server that answers the first request with `response`
    /// verbatim and then closes the connection.
    async fn serve_raw(response: Vec<u8>) -> Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(&response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{}/file.bin", addr)).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        starts: StdMutex<Vec<FetchStart>>,
        progress: StdMutex<Vec<FetchProgress>>,
        finished: StdMutex<Vec<FetchOutcome>>,
    }

    impl crate::reporter::FetchReporter for Recorder {
        fn on_start(&self, start: &FetchStart) {
            self.starts.lock().unwrap().push(start.clone());
        }

        fn on_progress(&self, progress: &FetchProgress) {
            self.progress.lock().unwrap().push(progress.clone());
        }

        fn on_finish(&self, outcome: &FetchOutcome) {
            self.finished.lock().unwrap().push(outcome.clone());
        }
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html; charset=utf-8"), "x.png"));
        assert!(is_html(Some("application/xhtml+xml"), "x"));
        assert!(!is_html(Some("image/png"), "x.html"));
        assert!(is_html(None, "index.HTML"));
        assert!(!is_html(None, "logo.png"));
    }

    #[tokio::test]
    async fn test_fetch_writes_file_and_reports() {
        let server = MockServer::start().await;
        let body = vec![b'x'; 3000];
        Mock::given(method("GET"))
            .and(path("/files/data.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED)
            .unwrap()
            .with_reporter(recorder.clone());

        let outcome = fetcher
            .fetch(
                &scope_for(&server),
                &url_on(&server, "/files/data.bin"),
                dir.path(),
                "data.bin",
            )
            .await;

        assert!(outcome.is_ok(), "{:?}", outcome.error);
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.bytes_total, Some(3000));
        assert_eq!(outcome.bytes_written, 3000);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), body);

        assert_eq!(recorder.starts.lock().unwrap().len(), 1);
        assert_eq!(recorder.finished.lock().unwrap().len(), 1);

        // At least 1024 + 1024 + 952, more if the body arrived in pieces.
        let progress = recorder.progress.lock().unwrap();
        assert!(progress.len() >= 3);
        assert_eq!(progress.last().unwrap().bytes_written, 3000);
    }

    #[tokio::test]
    async fn test_scope_mismatch_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();
        let other_scope =
            CrawlScope::from_url(&Url::parse("https://example.com/").unwrap()).unwrap();

        let outcome = fetcher
            .fetch(&other_scope, &url_on(&server, "/a.png"), dir.path(), "a.png")
            .await;

        assert_eq!(outcome.status, FetchStatus::ScopeError);
        assert_eq!(outcome.status_code, None);
        assert!(!dir.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn test_http_error_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested");
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();

        let outcome = fetcher
            .fetch(&scope_for(&server), &url_on(&server, "/missing.png"), &out, "missing.png")
            .await;

        assert_eq!(outcome.status, FetchStatus::HttpError);
        assert_eq!(outcome.status_code, Some(404));
        assert!(outcome.path.is_none());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_fetch_page_captures_html_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<a href=\"about.html\">About</a>"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0u8; 16]),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();
        let scope = scope_for(&server);

        let (outcome, body) = fetcher
            .fetch_page(&scope, &url_on(&server, "/index.html"), dir.path(), "index.html")
            .await;
        assert!(outcome.is_ok());
        assert!(body.unwrap().contains("about.html"));

        let (outcome, body) = fetcher
            .fetch_page(&scope, &url_on(&server, "/logo.png"), dir.path(), "logo.png")
            .await;
        assert!(outcome.is_ok());
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_floor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::new(4096)).unwrap();

        let start = std::time::Instant::now();
        let outcome = fetcher
            .fetch(&scope_for(&server), &url_on(&server, "/slow.bin"), dir.path(), "slow.bin")
            .await;

        assert!(outcome.is_ok());
        // 4096 bytes at 4096 B/s: one second, minus at most one chunk of slack.
        assert!(
            start.elapsed() >= Duration::from_millis(750),
            "finished in {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_redirect_off_scope_is_refused() {
        let home = MockServer::start().await;
        let foreign = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/evil.png", foreign.uri()).as_str()),
            )
            .expect(1)
            .mount(&home)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("FOREIGN"))
            .expect(0)
            .mount(&foreign)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();

        let outcome = fetcher
            .fetch(&scope_for(&home), &url_on(&home, "/logo.png"), dir.path(), "logo.png")
            .await;

        assert_eq!(outcome.status, FetchStatus::ScopeError);
        assert!(outcome.path.is_none());
        assert!(!dir.path().join("logo.png").exists());
    }

    #[tokio::test]
    async fn test_redirect_within_scope_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old.png"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new.png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 32]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();

        let outcome = fetcher
            .fetch(&scope_for(&server), &url_on(&server, "/old.png"), dir.path(), "old.png")
            .await;

        assert!(outcome.is_ok(), "{:?}", outcome.error);
        assert_eq!(outcome.bytes_written, 32);
        assert_eq!(std::fs::read(dir.path().join("old.png")).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_unknown_length_is_taken_from_stream() {
        let body = vec![b'z'; 2500];
        let mut response = b"HTTP/1.1 200 OK\r\n\
            Content-Type: application/octet-stream\r\n\
            Connection: close\r\n\r\n"
            .to_vec();
        response.extend_from_slice(&body);
        let url = serve_raw(response).await;

        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED)
            .unwrap()
            .with_reporter(recorder.clone());
        let scope = CrawlScope::from_url(&url).unwrap();

        let outcome = fetcher.fetch(&scope, &url, dir.path(), "file.bin").await;

        assert!(outcome.is_ok(), "{:?}", outcome.error);
        assert_eq!(outcome.bytes_total, Some(2500));
        assert_eq!(outcome.bytes_written, 2500);
        assert_eq!(std::fs::read(dir.path().join("file.bin")).unwrap(), body);
        assert_eq!(recorder.starts.lock().unwrap()[0].bytes_total, None);
    }

    #[tokio::test]
    async fn test_short_body_is_size_mismatch() {
        let mut response = b"HTTP/1.1 200 OK\r\n\
            Content-Type: application/octet-stream\r\n\
            Content-Length: 100\r\n\
            Connection: close\r\n\r\n"
            .to_vec();
        response.extend_from_slice(&[b'q'; 40]);
        let url = serve_raw(response).await;

        let dir = TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(RateBudget::UNLIMITED).unwrap();
        let scope = CrawlScope::from_url(&url).unwrap();

        let outcome = fetcher.fetch(&scope, &url, dir.path(), "file.bin").await;

        assert_eq!(outcome.status, FetchStatus::SizeMismatch);
        assert_eq!(outcome.bytes_total, Some(100));
        assert_eq!(outcome.bytes_written, 40);
        // The partial file stays on disk.
        assert_eq!(std::fs::read(dir.path().join("file.bin")).unwrap().len(), 40);
    }
}
