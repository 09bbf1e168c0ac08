//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to stand in for the crawl provider and an
//! on-disk SQLite database to exercise the full claim/crawl/store cycle.

use corpus_sieve::config::{Config, ProviderConfig, QueueConfig, ReducerConfig, StoreConfig};
use corpus_sieve::crawler::{crawl, CancelToken};
use corpus_sieve::state::SiteState;
use corpus_sieve::storage::{import_seeds, SqliteStorage, Storage};
use corpus_sieve::{ConfigError, CorpusError};
use serde_json::json;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::thread;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration against the given provider endpoint
fn create_test_config(endpoint: &str, api_key_env: &str, db_path: &Path) -> Config {
    Config {
        provider: ProviderConfig {
            endpoint: endpoint.to_string(),
            api_key_env: api_key_env.to_string(),
            page_limit: 50,
            timeout_secs: 10,
            max_response_bytes: 1024 * 1024,
        },
        queue: QueueConfig {
            retry_limit: 3,
            max_sites_per_run: 10,
        },
        store: StoreConfig {
            database_path: db_path.to_string_lossy().to_string(),
            max_document_bytes: 1024 * 1024,
            update_existing: false,
            max_value_bytes: None,
        },
        reducer: ReducerConfig::default(),
    }
}

fn seed(db_path: &Path, lines: &str) {
    let mut storage = SqliteStorage::new(db_path).unwrap();
    import_seeds(&mut storage, Cursor::new(lines.to_string())).unwrap();
}

#[tokio::test]
async fn test_full_batch_with_dedup_and_retries() {
    let mock_server = MockServer::start().await;
    let endpoint = format!("{}/crawl", mock_server.uri());
    std::env::set_var("CORPUS_TEST_KEY_FULL", "test-key");

    // Good site: two URLs share content, one page has no content
    Mock::given(method("POST"))
        .and(path("/crawl"))
        .and(header("authorization", "test-key"))
        .and(body_json(json!({"url": "https://good.test", "limit": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"url": "https://good.test/", "content": "<html><body><nav>Menu</nav><p>Hello <b>World</b></p></body></html>"},
                {"url": "https://good.test/index.html", "content": "<p>Hello World</p>"},
                {"url": "https://good.test/about", "content": "<div class=\"sidebar\">Links</div><p>About us</p>"},
                {"url": "https://good.test/broken", "content": null}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Failing site: provider error on every attempt
    Mock::given(method("POST"))
        .and(path("/crawl"))
        .and(body_json(json!({"url": "https://down.test", "limit": 50})))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");
    seed(&db_path, "good.test/,100654\nhttps://down.test,100655\n");

    let config = create_test_config(&endpoint, "CORPUS_TEST_KEY_FULL", &db_path);
    let summary = crawl(&config, 10, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.documents_inserted, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.failed_attempts, 3);
    assert_eq!(summary.errored, 1);
    assert!(!summary.cancelled);

    let storage = SqliteStorage::new(&db_path).unwrap();

    let good = storage.get_site("good.test/").unwrap().unwrap();
    assert_eq!(good.state, SiteState::Completed);
    assert_eq!(good.retry_count, 0);

    let down = storage.get_site("https://down.test").unwrap().unwrap();
    assert_eq!(down.state, SiteState::Errored);
    assert_eq!(down.retry_count, 3);

    let docs = storage.get_documents_for_site("https://good.test").unwrap();
    let contents: HashSet<_> = docs.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, HashSet::from(["Hello World", "About us"]));
    assert!(docs.iter().all(|d| d.tenant_id == "100654"));
}

#[tokio::test]
async fn test_second_run_short_circuits_completed_content() {
    let mock_server = MockServer::start().await;
    let endpoint = format!("{}/crawl", mock_server.uri());
    std::env::set_var("CORPUS_TEST_KEY_RERUN", "test-key");

    Mock::given(method("POST"))
        .and(path("/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"url": "https://twice.test/", "content": "<p>Only once</p>"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");
    // Both seeds normalize to the same site key
    seed(&db_path, "twice.test,1\nhttps://twice.test/,1\n");

    let config = create_test_config(&endpoint, "CORPUS_TEST_KEY_RERUN", &db_path);
    let summary = crawl(&config, 10, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.already_satisfied, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_documents().unwrap(), 1);
    assert_eq!(
        storage.count_sites_by_state(SiteState::Completed).unwrap(),
        2
    );
}

#[tokio::test]
async fn test_malformed_payload_is_failed_attempt() {
    let mock_server = MockServer::start().await;
    let endpoint = format!("{}/crawl", mock_server.uri());
    std::env::set_var("CORPUS_TEST_KEY_MALFORMED", "test-key");

    Mock::given(method("POST"))
        .and(path("/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"items\": [ {\"url\": "))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");
    seed(&db_path, "broken.test,7\n");

    let config = create_test_config(&endpoint, "CORPUS_TEST_KEY_MALFORMED", &db_path);
    let summary = crawl(&config, 1, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.sites_processed, 1);
    assert_eq!(summary.failed_attempts, 1);
    assert_eq!(summary.errored, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let site = storage.get_site("broken.test").unwrap().unwrap();
    assert_eq!(site.state, SiteState::Pending);
    assert_eq!(site.retry_count, 1);
    assert_eq!(storage.count_documents().unwrap(), 0);
}

#[tokio::test]
async fn test_missing_api_key_claims_nothing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");
    seed(&db_path, "example.test,1\n");

    let config = create_test_config(
        "http://127.0.0.1:9/crawl",
        "CORPUS_TEST_KEY_NEVER_SET",
        &db_path,
    );
    let err = crawl(&config, 10, &CancelToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        CorpusError::Config(ConfigError::MissingApiKey(_))
    ));

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(
        storage.count_sites_by_state(SiteState::Pending).unwrap(),
        1
    );
}

#[test]
fn test_concurrent_claims_are_exclusive() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");

    let lines: String = (0..60).map(|i| format!("site{}.test,{}\n", i, i)).collect();
    seed(&db_path, &lines);

    // Each worker opens its own connection, as separate processes would
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let db_path = db_path.clone();
            thread::spawn(move || {
                let mut storage = SqliteStorage::new(&db_path).unwrap();
                let mut claimed = Vec::new();
                while let Some(site) = storage.claim_next_site().unwrap() {
                    claimed.push(site.address);
                }
                claimed
            })
        })
        .collect();

    let mut all = Vec::new();
    for worker in workers {
        all.extend(worker.join().unwrap());
    }

    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(all.len(), 60);
    assert_eq!(unique.len(), 60);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_sites_by_state(SiteState::Claimed).unwrap(), 60);
    assert_eq!(storage.count_sites_by_state(SiteState::Pending).unwrap(), 0);
}
