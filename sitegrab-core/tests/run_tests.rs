// Tests for run orchestration

use sitegrab_core::{FetchRequest, RequestError, RunMode, execute_fetch_with};
use sitegrab_scanner::{FetchStatus, LogFileReporter, RejectList, SilentReporter};
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn request_for(url: String, dir: &TempDir) -> FetchRequest {
    let mut request = FetchRequest::new(url);
    request.download_path = dir.path().to_path_buf();
    request
}

// ============================================================================
// Single Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_single_fetch_saves_under_download_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 2048]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let request = request_for(format!("{}/files/report.pdf", server.uri()), &dir);

    let summary = execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Single);
    assert_eq!(summary.ok_count(), 1);
    assert_eq!(summary.total_bytes(), 2048);
    assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap().len(), 2048);
}

#[tokio::test]
async fn test_single_fetch_honours_output_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut request = request_for(format!("{}/download", server.uri()), &dir);
    request.output_file = Some("saved.txt".to_string());

    execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("saved.txt")).unwrap(),
        "payload"
    );
    assert!(!dir.path().join("download").exists());
}

#[tokio::test]
async fn test_single_fetch_http_error_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let request = request_for(format!("{}/missing.zip", server.uri()), &dir);

    let summary = execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();

    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.outcomes[0].status, FetchStatus::HttpError);
    assert!(!dir.path().join("missing.zip").exists());
}

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let request = request_for(String::new(), &dir);

    let result = execute_fetch_with(&request, Arc::new(SilentReporter)).await;
    assert!(matches!(result, Err(RequestError::MissingUrl)));
}

#[tokio::test]
async fn test_rejected_single_url_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut request = request_for(format!("{}/photo.jpg", server.uri()), &dir);
    request.reject = RejectList::parse("jpg");

    let summary = execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();
    assert!(summary.outcomes.is_empty());
}

// ============================================================================
// Batch Tests
// ============================================================================

#[tokio::test]
async fn test_batch_fetches_every_listed_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/one.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("one"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/two.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("two!"))
        .expect(1)
        .mount(&server)
        .await;

    let mut list = NamedTempFile::new().unwrap();
    writeln!(list, "{}/one.txt", server.uri()).unwrap();
    writeln!(list).unwrap();
    writeln!(list, "{}/two.txt", server.uri()).unwrap();

    let dir = TempDir::new().unwrap();
    let mut request = FetchRequest::default();
    request.download_path = dir.path().to_path_buf();
    request.url_file = Some(list.path().to_path_buf());

    let summary = execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Batch);
    assert_eq!(summary.targets.len(), 2);
    assert_eq!(summary.ok_count(), 2);
    assert_eq!(std::fs::read_to_string(dir.path().join("one.txt")).unwrap(), "one");
    assert_eq!(std::fs::read_to_string(dir.path().join("two.txt")).unwrap(), "two!");
}

// ============================================================================
// Mirror Tests
// ============================================================================

#[tokio::test]
async fn test_mirror_run_builds_host_tree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<a href="about.html">About</a><img src="img/logo.png"><a href="about.html">again</a>"#,
                ),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<p>about us</p>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 64]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut request = request_for(format!("{}/index.html", server.uri()), &dir);
    request.mirror = true;
    request.workers = 2;

    let summary = execute_fetch_with(&request, Arc::new(SilentReporter))
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Mirror);
    assert_eq!(summary.ok_count(), 3);

    let host = url::Url::parse(&server.uri()).unwrap();
    let root = dir.path().join(format!(
        "{}:{}",
        host.host_str().unwrap(),
        host.port().unwrap()
    ));
    assert!(root.join("index.html").is_file());
    assert!(root.join("about.html").is_file());
    assert!(root.join("img").join("logo.png").is_file());
}

// ============================================================================
// Log File Tests
// ============================================================================

#[tokio::test]
async fn test_log_reporter_gets_one_block_per_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 100]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("wget-log");
    let reporter = Arc::new(LogFileReporter::create(&log_path).unwrap());

    let mut request = request_for(format!("{}/a.bin", server.uri()), &dir);
    request.log_to_file = true;

    execute_fetch_with(&request, reporter).await.unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("status 200 OK"));
    assert!(log.contains("Content size: 100"));
    assert!(log.contains(&format!("Download completed [{}/a.bin]", server.uri())));
}
