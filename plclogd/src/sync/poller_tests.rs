use super::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn make_poller(base_url: &str, root: &Path) -> Poller {
    let data_dir = root.join("CSV");
    std::fs::create_dir_all(&data_dir).unwrap();
    let client = DataLogClient::with_base_url(base_url).unwrap();
    let log = EventLog::new(root.join("log.txt")).with_echo(false);
    Poller::new(client, data_dir, log)
}

async fn mount_listing(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/DataLogs"))
        .and(query_param("Action", "LIST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, remote: &str, status: u16, body: &[u8], calls: u64) {
    Mock::given(method("GET"))
        .and(path(remote))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .expect(calls)
        .mount(server)
        .await;
}

fn read_log(poller: &Poller) -> String {
    std::fs::read_to_string(poller.log().path()).unwrap_or_default()
}

#[tokio::test]
async fn existing_file_is_registered_once_and_never_downloaded() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\r\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"remote", 0).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());
    std::fs::write(poller.data_dir().join("a.csv"), b"local").unwrap();

    let first = poller.tick().await;
    let second = poller.tick().await;

    assert_eq!(first.skipped, 1);
    assert_eq!(first.downloaded, 0);
    assert_eq!(second, TickReport { listed: 1, ..TickReport::default() });
    assert!(poller.is_registered("/DataLogs/a.csv").await);
    assert_eq!(poller.registered_count().await, 1);
    assert_eq!(
        std::fs::read(poller.data_dir().join("a.csv")).unwrap(),
        b"local"
    );
    assert_eq!(
        read_log(&poller)
            .matches("[skipped - already exists] a.csv")
            .count(),
        1
    );
}

#[tokio::test]
async fn missing_file_is_downloaded_and_registered() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"t;v\n1;2\n", 1).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert_eq!(report.downloaded, 1);
    assert_eq!(
        std::fs::read(poller.data_dir().join("a.csv")).unwrap(),
        b"t;v\n1;2\n"
    );
    assert!(poller.is_registered("/DataLogs/a.csv").await);
    assert!(read_log(&poller).contains("] [downloaded] a.csv\n"));
}

#[tokio::test]
async fn failed_download_leaves_nothing_and_retries_next_tick() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 500, b"", 2).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let first = poller.tick().await;
    assert_eq!(first.failed, 1);
    assert!(!poller.data_dir().join("a.csv").exists());
    assert!(!poller.is_registered("/DataLogs/a.csv").await);

    let second = poller.tick().await;
    assert_eq!(second.failed, 1);

    let log = read_log(&poller);
    assert_eq!(log.matches("[download error] a.csv: HTTP 500").count(), 2);
}

#[tokio::test]
async fn second_tick_does_not_download_again() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"data", 1).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    assert_eq!(poller.tick().await.downloaded, 1);
    let second = poller.tick().await;
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 0);
    assert_eq!(read_log(&poller).matches("[downloaded] a.csv").count(), 1);
}

#[tokio::test]
async fn restarted_poller_skips_previously_downloaded_file() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"data", 1).await;

    let dir = tempdir().unwrap();
    let first_run = make_poller(&server.uri(), dir.path());
    assert_eq!(first_run.tick().await.downloaded, 1);
    drop(first_run);

    let restarted = make_poller(&server.uri(), dir.path());
    let report = restarted.tick().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.downloaded, 0);
    assert!(restarted.is_registered("/DataLogs/a.csv").await);
    assert!(read_log(&restarted).contains("[skipped - already exists] a.csv"));
}

#[tokio::test]
async fn listing_not_found_is_logged_as_general_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/DataLogs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"data", 0).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert!(report.listing_failed);
    assert_eq!(report.listed, 0);
    let log = read_log(&poller);
    assert!(log.contains("[general error]"));
    assert!(log.contains("404"));
    assert_eq!(poller.registered_count().await, 0);
}

#[tokio::test]
async fn unreachable_controller_is_logged_as_general_error() {
    let dir = tempdir().unwrap();
    let poller = make_poller("http://127.0.0.1:1", dir.path());

    let report = poller.tick().await;

    assert!(report.listing_failed);
    assert!(read_log(&poller).contains("[general error] request failed"));
}

#[tokio::test]
async fn one_failed_download_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n/DataLogs/b.csv\n/DataLogs/c.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 500, b"", 1).await;
    mount_file(&server, "/DataLogs/b.csv", 200, b"b", 1).await;
    mount_file(&server, "/DataLogs/c.csv", 200, b"c", 1).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert_eq!(
        report,
        TickReport {
            listed: 3,
            skipped: 0,
            downloaded: 2,
            failed: 1,
            listing_failed: false,
        }
    );
    assert!(!poller.data_dir().join("a.csv").exists());
    assert!(poller.data_dir().join("b.csv").exists());
    assert!(poller.data_dir().join("c.csv").exists());

    let log = read_log(&poller);
    let failed_at = log.find("[download error] a.csv").unwrap();
    let b_at = log.find("[downloaded] b.csv").unwrap();
    let c_at = log.find("[downloaded] c.csv").unwrap();
    assert!(failed_at < b_at && b_at < c_at);
}

#[tokio::test]
async fn duplicate_listing_entries_download_once() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"data", 1).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert_eq!(report.listed, 2);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn local_file_name_gates_downloads_across_remote_folders() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/2024/a.csv\n/DataLogs/2025/a.csv\n").await;
    mount_file(&server, "/DataLogs/2024/a.csv", 200, b"first", 1).await;
    mount_file(&server, "/DataLogs/2025/a.csv", 200, b"second", 0).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.skipped, 1);
    assert!(poller.is_registered("/DataLogs/2025/a.csv").await);
    assert_eq!(
        std::fs::read(poller.data_dir().join("a.csv")).unwrap(),
        b"first"
    );
}

#[tokio::test]
async fn entry_without_file_name_is_reported_and_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/\n/DataLogs/b.csv\n").await;
    mount_file(&server, "/DataLogs/b.csv", 200, b"b", 1).await;

    let dir = tempdir().unwrap();
    let poller = make_poller(&server.uri(), dir.path());

    let report = poller.tick().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.downloaded, 1);
    assert!(read_log(&poller).contains("[download error] /DataLogs/: remote path has no file name"));
}

#[tokio::test]
async fn sequential_run_downloads_and_stops_on_shutdown() {
    let server = MockServer::start().await;
    mount_listing(&server, "/DataLogs/a.csv\n").await;
    mount_file(&server, "/DataLogs/a.csv", 200, b"data", 1).await;

    let dir = tempdir().unwrap();
    let poller = Arc::new(make_poller(&server.uri(), dir.path()));

    let started = Arc::clone(&poller)
        .run(
            Duration::from_millis(20),
            TickMode::Sequential,
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

    assert!(started >= 2);
    assert!(poller.data_dir().join("a.csv").exists());
    assert_eq!(poller.registered_count().await, 1);
}

#[tokio::test]
async fn sequential_run_waits_for_slow_tick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/DataLogs"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let poller = Arc::new(make_poller(&server.uri(), dir.path()));

    let started = poller
        .run(
            Duration::from_millis(20),
            TickMode::Sequential,
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await;

    assert_eq!(started, 1);
}

#[tokio::test]
async fn overlapping_run_starts_ticks_while_previous_are_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/DataLogs"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let poller = Arc::new(make_poller(&server.uri(), dir.path()));

    let started = poller
        .run(
            Duration::from_millis(20),
            TickMode::Overlapping,
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await;

    assert!(started >= 3);
}
