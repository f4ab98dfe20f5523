//! Integration tests for link discovery
//!
//! These tests use wiremock to serve a small paginated index and check how
//! discovery walks it over real HTTP.

mod common;

use allpages_harvester::config::DEFAULT_INDEX_TABLE_SELECTOR;
use allpages_harvester::crawler::{parse_selector, HttpFetcher, LinkDiscoverer};
use allpages_harvester::{ErrorKind, HarvestError};
use common::{create_test_config, index_page, listing_page, mount_page};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn discoverer_for(server: &MockServer) -> (Url, LinkDiscoverer<HttpFetcher>) {
    let config = create_test_config(&server.uri(), "unused");
    let index_url = Url::parse(&config.site.index_url).unwrap();
    let fetcher = HttpFetcher::from_config(&config.http, &index_url).unwrap();
    let selector = parse_selector(DEFAULT_INDEX_TABLE_SELECTOR).unwrap();
    (index_url, LinkDiscoverer::new(Arc::new(fetcher), selector, 2))
}

#[tokio::test]
async fn test_each_page_fetched_once() {
    let server = MockServer::start().await;

    mount_page(&server, "/", index_page(&["/allpages/a", "/allpages/b"]), 1).await;
    mount_page(
        &server,
        "/allpages/a",
        listing_page(
            &[("Anugul", "/wiki/Anugul"), ("Athagarh", "/wiki/Athagarh")],
            &["/allpages/b", "/allpages/a2"],
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/allpages/a2",
        listing_page(&[("Aska", "/wiki/Aska")], &["/allpages/a"]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/allpages/b",
        listing_page(&[("Balasore", "/wiki/Balasore")], &[]),
        1,
    )
    .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let links = discoverer.discover_all_links(&index_url).await.unwrap();

    assert_eq!(links.len(), 4);
    for name in ["Anugul", "Athagarh", "Aska", "Balasore"] {
        assert!(links.contains(name), "missing {}", name);
    }
    for (_, url) in links.iter() {
        assert_eq!(url.origin(), index_url.origin());
    }
}

#[tokio::test]
async fn test_section_stops_when_nothing_new_appears() {
    let server = MockServer::start().await;

    mount_page(&server, "/", index_page(&["/allpages/a"]), 1).await;
    mount_page(
        &server,
        "/allpages/a",
        listing_page(&[("Anugul", "/wiki/Anugul")], &["/allpages/a", "/allpages/a2"]),
        1,
    )
    .await;
    // Same titles again, still pointing onwards: the count does not grow, so stop here
    mount_page(
        &server,
        "/allpages/a2",
        listing_page(&[("Anugul", "/wiki/Anugul")], &["/allpages/a", "/allpages/a3"]),
        1,
    )
    .await;
    mount_page(&server, "/allpages/a3", listing_page(&[], &[]), 0).await;

    let (index_url, discoverer) = discoverer_for(&server);
    let links = discoverer.discover_all_links(&index_url).await.unwrap();

    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_duplicate_title_takes_later_section() {
    let server = MockServer::start().await;

    mount_page(&server, "/", index_page(&["/allpages/a", "/allpages/b"]), 1).await;
    mount_page(
        &server,
        "/allpages/a",
        listing_page(&[("Konark", "/wiki/Konark_old")], &[]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/allpages/b",
        listing_page(&[("Konark", "/wiki/Konark")], &[]),
        1,
    )
    .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let links = discoverer.discover_all_links(&index_url).await.unwrap();

    assert_eq!(links.len(), 1);
    assert_eq!(links.get("Konark").unwrap().path(), "/wiki/Konark");
}

#[tokio::test]
async fn test_off_site_links_are_ignored() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        index_page(&["/allpages/a", "https://en.wikipedia.org/wiki/Special:AllPages"]),
        1,
    )
    .await;
    mount_page(
        &server,
        "/allpages/a",
        listing_page(
            &[
                ("Local", "/wiki/Local"),
                ("Elsewhere", "https://en.wikipedia.org/wiki/Elsewhere"),
            ],
            &[],
        ),
        1,
    )
    .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let links = discoverer.discover_all_links(&index_url).await.unwrap();

    assert_eq!(links.len(), 1);
    assert!(links.contains("Local"));
}

#[tokio::test]
async fn test_missing_index_table_aborts() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        "<html><body><table><tr><td>redesigned</td></tr></table></body></html>".to_string(),
        1,
    )
    .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let err = discoverer.discover_all_links(&index_url).await.unwrap_err();

    assert!(matches!(err, HarvestError::IndexStructureChanged { .. }));
    assert_eq!(err.kind(), ErrorKind::IndexStructureChanged);
}

#[tokio::test]
async fn test_unreachable_index_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let err = discoverer.discover_all_links(&index_url).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unreachable);
}

#[tokio::test]
async fn test_failing_section_keeps_the_rest() {
    let server = MockServer::start().await;

    mount_page(&server, "/", index_page(&["/allpages/a", "/allpages/b"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/allpages/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/allpages/b",
        listing_page(&[("Bargarh", "/wiki/Bargarh")], &[]),
        1,
    )
    .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let links = discoverer.discover_all_links(&index_url).await.unwrap();

    assert_eq!(links.len(), 1);
    assert!(links.contains("Bargarh"));
}

#[tokio::test]
async fn test_shutdown_interrupts_slow_section() {
    let server = MockServer::start().await;

    mount_page(&server, "/", index_page(&["/allpages/a"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/allpages/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[("Anugul", "/wiki/Anugul")], &[]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let (index_url, discoverer) = discoverer_for(&server);
    let (tx, rx) = watch::channel(false);
    let discoverer = discoverer.with_shutdown(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = tx.send(true);
    });

    let started = Instant::now();
    let err = discoverer.discover_all_links(&index_url).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}
