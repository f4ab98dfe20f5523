//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full discover-and-harvest cycle end-to-end.

mod common;

use allpages_harvester::crawler::Coordinator;
use allpages_harvester::{DiscoveredLinks, DocumentState, ErrorKind};
use common::{article_page, create_test_config, index_page, listing_page, mount_page};
use std::fs;
use tempfile::tempdir;
use tokio::sync::watch;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts an index with one section listing the given `(title, route)` articles
async fn mount_single_section(server: &MockServer, articles: &[(&str, &str)]) {
    mount_page(server, "/", index_page(&["/allpages/all"]), 1).await;
    mount_page(server, "/allpages/all", listing_page(articles, &[]), 1).await;
}

#[tokio::test]
async fn test_full_harvest_writes_normalized_documents() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();

    mount_single_section(
        &server,
        &[("Puri", "/wiki/Puri"), ("Konark", "/wiki/Konark")],
    )
    .await;
    mount_page(
        &server,
        "/wiki/Puri",
        article_page(&[
            "Puri (ପୁରୀ) is a city [1] on the coast.",
            "It is known for the Jagannath temple&lt;ref&gt;.",
        ]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/wiki/Konark",
        article_page(&["\u{feff}Konark\u{a0}Sun Temple , Odisha"]),
        1,
    )
    .await;

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run(false).await.unwrap();

    assert_eq!(report.total_documents, 2);
    assert_eq!(report.count(DocumentState::Written), 2);
    assert!(report.failures.is_empty());

    let puri = fs::read_to_string(output.path().join("Puri.txt")).unwrap();
    assert_eq!(
        puri,
        "Puri is a city on the coast.\nIt is known for the Jagannath temple."
    );

    let konark = fs::read_to_string(output.path().join("Konark.txt")).unwrap();
    assert_eq!(konark, "Konark Sun Temple, Odisha");
}

#[tokio::test]
async fn test_failing_document_does_not_block_others() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();

    mount_single_section(
        &server,
        &[
            ("Cuttack", "/wiki/Cuttack"),
            ("Missing", "/wiki/Missing"),
            ("Flaky", "/wiki/Flaky"),
            ("Sambalpur", "/wiki/Sambalpur"),
        ],
    )
    .await;
    mount_page(&server, "/wiki/Cuttack", article_page(&["Cuttack"]), 1).await;
    mount_page(&server, "/wiki/Sambalpur", article_page(&["Sambalpur"]), 1).await;

    // Not retried
    Mock::given(method("GET"))
        .and(path("/wiki/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Retried until the attempt budget runs out
    Mock::given(method("GET"))
        .and(path("/wiki/Flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator.run(false).await.unwrap();

    assert_eq!(report.count(DocumentState::Written), 2);
    assert_eq!(report.count(DocumentState::Failed), 2);
    assert!(report
        .failures
        .iter()
        .all(|failure| failure.kind == ErrorKind::Unreachable));

    assert!(output.path().join("Cuttack.txt").exists());
    assert!(output.path().join("Sambalpur.txt").exists());
    assert!(!output.path().join("Missing.txt").exists());
    assert!(!output.path().join("Flaky.txt").exists());
}

#[tokio::test]
async fn test_page_without_paragraphs() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();

    mount_single_section(&server, &[("Stub", "/wiki/Stub")]).await;
    mount_page(
        &server,
        "/wiki/Stub",
        "<html><body><div>Only a table</div></body></html>".to_string(),
        2,
    )
    .await;

    // Default: an empty document is kept
    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let report = Coordinator::new(config.clone())
        .unwrap()
        .run(false)
        .await
        .unwrap();
    assert_eq!(report.count(DocumentState::Empty), 1);
    assert_eq!(fs::read_to_string(output.path().join("Stub.txt")).unwrap(), "");

    // skip-empty: nothing is written
    let skipped = tempdir().unwrap();
    let mut config = config;
    config.output.output_dir = skipped.path().to_str().unwrap().to_string();
    config.crawler.skip_empty = true;
    let coordinator = Coordinator::new(config).unwrap();
    let mut links = allpages_harvester::DiscoveredLinks::new();
    links.insert(
        "Stub",
        url::Url::parse(&format!("{}/wiki/Stub", server.uri())).unwrap(),
    );
    let report = coordinator.crawl(links).await.unwrap();

    assert_eq!(report.count(DocumentState::SkippedEmpty), 1);
    assert!(!skipped.path().join("Stub.txt").exists());
}

#[tokio::test]
async fn test_links_cache_and_resume() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();
    let links_path = output.path().join("all_links.toml");

    // Discovery runs once; the second harvest loads the cache
    mount_single_section(&server, &[("Puri", "/wiki/Puri"), ("Bhadrak", "/wiki/Bhadrak")])
        .await;
    // Already on disk from an earlier run, so never fetched
    mount_page(&server, "/wiki/Puri", article_page(&["Puri"]), 0).await;
    mount_page(&server, "/wiki/Bhadrak", article_page(&["Bhadrak"]), 1).await;

    fs::write(output.path().join("Puri.txt"), "from an earlier run").unwrap();

    let mut config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    config.output.links_path = Some(links_path.to_str().unwrap().to_string());
    config.crawler.skip_existing = true;

    let coordinator = Coordinator::new(config.clone()).unwrap();
    let first = coordinator.run(false).await.unwrap();
    assert_eq!(first.count(DocumentState::SkippedExisting), 1);
    assert_eq!(first.count(DocumentState::Written), 1);
    assert!(links_path.exists());

    let second = Coordinator::new(config).unwrap().run(false).await.unwrap();
    assert_eq!(second.count(DocumentState::SkippedExisting), 2);
    assert_eq!(
        fs::read_to_string(output.path().join("Puri.txt")).unwrap(),
        "from an earlier run"
    );
}

#[tokio::test]
async fn test_structure_change_fails_the_run() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();

    mount_page(
        &server,
        "/",
        "<html><body><p>Main page redesigned</p></body></html>".to_string(),
        1,
    )
    .await;

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let err = Coordinator::new(config).unwrap().run(false).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IndexStructureChanged);
}

#[tokio::test]
async fn test_titles_differing_in_separators_get_own_files() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();

    mount_page(&server, "/wiki/AC/DC", article_page(&["The band."]), 1).await;
    mount_page(&server, "/wiki/AC_DC", article_page(&["The current."]), 1).await;

    let mut links = DiscoveredLinks::new();
    links.insert("AC/DC", Url::parse(&format!("{}/wiki/AC/DC", server.uri())).unwrap());
    links.insert("AC_DC", Url::parse(&format!("{}/wiki/AC_DC", server.uri())).unwrap());

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let report = Coordinator::new(config).unwrap().crawl(links).await.unwrap();

    assert_eq!(report.count(DocumentState::Written), 2);
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 2);
    assert_eq!(
        fs::read_to_string(output.path().join("AC%2FDC.txt")).unwrap(),
        "The band."
    );
    assert_eq!(
        fs::read_to_string(output.path().join("AC_DC.txt")).unwrap(),
        "The current."
    );
}

#[tokio::test]
async fn test_cancelled_discovery_saves_no_cache() {
    let server = MockServer::start().await;
    let output = tempdir().unwrap();
    let links_path = output.path().join("all_links.toml");

    mount_page(&server, "/", index_page(&["/allpages/all"]), 0).await;

    let mut config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    config.output.links_path = Some(links_path.to_str().unwrap().to_string());

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let coordinator = Coordinator::new(config).unwrap().with_shutdown(rx);

    let err = coordinator.run(false).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!links_path.exists());
}
