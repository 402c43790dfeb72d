//! Walks against a SQLite file with heavily shared category URLs

use catwalk::config::parse_config;
use catwalk::crawler::{build_http_client, CategoryNode, Walker};
use catwalk::storage::{open_storage, PersistenceGateway, SqliteStorage};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn ok_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/category/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;
    server
}

fn walker_for(server: &MockServer, gateway: Arc<dyn PersistenceGateway>, cap: Option<usize>) -> Walker {
    let api = parse_config(&format!("[api]\nbase-url = \"{}\"\n", server.uri()))
        .unwrap()
        .api;
    let client = build_http_client(&api).unwrap();
    Walker::builder(client, api, gateway)
        .concurrency_limit(cap)
        .build()
}

/// Forty roots, each with the same three leaf slugs underneath
fn overlapping_forest() -> Vec<CategoryNode> {
    (0..40)
        .map(|i| {
            CategoryNode::with_children(
                i,
                format!("root-{}", i),
                vec![
                    CategoryNode::leaf(1000, "alpha"),
                    CategoryNode::leaf(1001, "beta"),
                    CategoryNode::leaf(1002, "gamma"),
                ],
            )
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_shared_urls_leave_no_dangling_requests() {
    let server = ok_server().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("requests.db");
    let storage = Arc::new(open_storage(&db_path).unwrap());

    let stats = walker_for(&server, storage.clone(), None)
        .walk(overlapping_forest())
        .await;

    assert_eq!(stats.visited, 160);
    assert_eq!(stats.persisted, 160);
    assert_eq!(stats.persist_failures, 0);
    assert_eq!(storage.count_pages().unwrap(), 43);
    assert_eq!(storage.count_requests().unwrap(), 160);
    assert_eq!(storage.count_dangling_requests().unwrap(), 0);

    let alpha = storage
        .get_page_by_url(&format!("{}/category/alpha", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(storage.requests_for_page(alpha.id).unwrap().len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_two_stores_on_one_file_agree_on_page_ids() {
    let server = ok_server().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("requests.db");
    let first: Arc<SqliteStorage> = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let second: Arc<SqliteStorage> = Arc::new(SqliteStorage::new(&db_path).unwrap());

    let walk_a = walker_for(&server, first.clone(), Some(4));
    let walk_b = walker_for(&server, second.clone(), Some(4));
    let (a, b) = tokio::join!(
        walk_a.walk(overlapping_forest()),
        walk_b.walk(overlapping_forest())
    );

    assert_eq!(a.persisted + b.persisted, 320);
    assert_eq!(first.count_pages().unwrap(), 43);
    assert_eq!(first.count_requests().unwrap(), 320);
    assert_eq!(second.count_dangling_requests().unwrap(), 0);

    let url = format!("{}/category/beta", server.uri());
    assert_eq!(
        first.get_page_by_url(&url).unwrap().unwrap().id,
        second.get_page_by_url(&url).unwrap().unwrap().id
    );
}
