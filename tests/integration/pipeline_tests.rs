//! End-to-end runs: bootstrap, walk, persist, report, notify

use async_trait::async_trait;
use catwalk::config::parse_config;
use catwalk::crawler::{report_since, Coordinator};
use catwalk::notify::{Notifier, NotifyError, TelegramNotifier};
use catwalk::storage::SqliteStorage;
use catwalk::CatwalkError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn config_toml(server: &MockServer, db_path: &str) -> String {
    format!(
        r#"
[api]
base-url = "{}"

[output]
database-path = "{}"
"#,
        server.uri(),
        db_path
    )
}

async fn mount_category(server: &MockServer, slug: &str, status: u16, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/category/{}", slug)))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(r#"{"pagination": {"totalCount": 3, "page": 1}}"#)
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_node_tree_reports_single_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id": 1, "slug": "root", "children": [
                {"id": 2, "slug": "slow-child", "children": []},
                {"id": 3, "slug": "fast-child", "children": null}
            ]}]"#,
        ))
        .mount(&server)
        .await;
    mount_category(&server, "root", 200, Duration::from_millis(500)).await;
    mount_category(&server, "slow-child", 200, Duration::from_millis(3000)).await;
    mount_category(&server, "fast-child", 200, Duration::from_millis(1000)).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let config = parse_config(&config_toml(&server, db_path.to_str().unwrap())).unwrap();

    let coordinator = Coordinator::new(config).unwrap();
    let notifier = RecordingNotifier::default();
    let summary = coordinator.run(&notifier).await.unwrap();

    assert_eq!(summary.roots, 1);
    assert_eq!(summary.nodes, 3);
    assert_eq!(summary.walk.visited, 3);
    assert_eq!(summary.walk.persisted, 3);
    assert!(summary.notified);

    let storage = coordinator.storage();
    assert_eq!(storage.count_pages().unwrap(), 3);
    assert_eq!(storage.count_requests().unwrap(), 3);
    assert_eq!(storage.count_dangling_requests().unwrap(), 0);

    assert_eq!(summary.report.slow.len(), 1);
    assert!(summary.report.slow[0].url.ends_with("/category/slow-child"));
    assert!(summary.report.slow[0].elapsed_seconds >= 3.0);
    assert!(summary.report.errors.is_empty());

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Slow requests"));
    assert!(sent[0].contains("1. "));
    assert!(sent[0].contains("slow-child"));
    assert!(!sent[0].contains("2. "));
    assert!(!sent[0].contains("Failed requests"));
}

#[tokio::test]
async fn test_empty_menu_skips_notification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let config = parse_config(&config_toml(&server, db_path.to_str().unwrap())).unwrap();

    let coordinator = Coordinator::new(config).unwrap();
    let notifier = RecordingNotifier::default();
    let summary = coordinator.run(&notifier).await.unwrap();

    assert_eq!(summary.roots, 0);
    assert_eq!(summary.walk.visited, 0);
    assert!(!summary.notified);
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_menu_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let config = parse_config(&config_toml(&server, db_path.to_str().unwrap())).unwrap();

    let coordinator = Coordinator::new(config).unwrap();
    let notifier = RecordingNotifier::default();
    let result = coordinator.run(&notifier).await;

    assert!(matches!(result, Err(CatwalkError::BootstrapDecode { .. })));
    assert_eq!(coordinator.storage().count_pages().unwrap(), 0);
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_categories_reach_telegram() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id": 1, "slug": "gone", "children": []},
                {"id": 2, "slug": "broken", "children": []}]"#,
        ))
        .mount(&server)
        .await;
    mount_category(&server, "gone", 404, Duration::ZERO).await;
    mount_category(&server, "broken", 500, Duration::from_millis(200)).await;
    Mock::given(method("POST"))
        .and(path("/bot42:secret/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let toml = format!(
        "{}\n[telegram]\ntoken = \"42:secret\"\nchat-id = \"7\"\napi-base = \"{}\"\n",
        config_toml(&server, db_path.to_str().unwrap()),
        server.uri()
    );
    let config = parse_config(&toml).unwrap();
    let telegram = config.telegram.clone().unwrap();

    let coordinator = Coordinator::new(config).unwrap();
    let notifier = TelegramNotifier::new(coordinator.client().clone(), &telegram);
    let summary = coordinator.run(&notifier).await.unwrap();

    assert!(summary.notified);
    assert!(summary.report.slow.is_empty());
    assert_eq!(summary.report.errors.len(), 2);
    // Slowest first
    assert!(summary.report.errors[0].url.ends_with("/category/broken"));
    assert_eq!(summary.report.errors[0].status, 500);
    assert_eq!(summary.report.errors[1].status, 404);
}

#[tokio::test]
async fn test_second_run_reports_only_its_own_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"id": 1, "slug": "flaky", "children": []}]"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let toml = config_toml(&server, db_path.to_str().unwrap());

    let first = Coordinator::new(parse_config(&toml).unwrap()).unwrap();
    let notifier = RecordingNotifier::default();
    let summary = first.run(&notifier).await.unwrap();
    assert_eq!(summary.report.errors.len(), 1);
    drop(first);

    let second = Coordinator::new(parse_config(&toml).unwrap()).unwrap();
    let summary = second.run(&notifier).await.unwrap();
    assert!(summary.report.is_empty());
    assert!(!summary.notified);

    // Both runs share one page row
    assert_eq!(second.storage().count_pages().unwrap(), 1);
    assert_eq!(second.storage().count_requests().unwrap(), 2);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);

    // The stored failure is still reachable through a wider window
    let reopened = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let config = parse_config(&toml).unwrap();
    let (report, digest) = report_since(&reopened, &summary.started_at, &config);
    assert!(report.is_empty());
    assert!(digest.is_none());

    let (report, _) = report_since(
        &reopened,
        &(summary.started_at - chrono::Duration::hours(1)),
        &config,
    );
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].status, 503);
}
