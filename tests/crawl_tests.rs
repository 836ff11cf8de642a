//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! full indexing runs end-to-end.

use lemma_seek::config::{
    Config, CrawlerConfig, LemmatizerConfig, SearchConfig, SiteEntry, StorageConfig,
    UserAgentConfig,
};
use lemma_seek::crawler::IndexingService;
use lemma_seek::lemma::Lemmatizer;
use lemma_seek::search::{SearchEngine, SearchQuery};
use lemma_seek::state::{SiteStatus, STOPPED_BY_USER};
use lemma_seek::storage::{lock_storage, open_storage, SharedStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the given site roots
fn create_test_config(roots: &[String], db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            batch_size: 2,
            max_concurrent_batches: 2,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            name: "TestBot/1.0".to_string(),
            referrer: "https://www.google.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
        search: SearchConfig::default(),
        lemmatizer: LemmatizerConfig::default(),
        sites: roots
            .iter()
            .enumerate()
            .map(|(i, url)| SiteEntry {
                url: url.clone(),
                name: format!("Site {}", i),
            })
            .collect(),
    }
}

/// Opens a fresh database and builds the service over it
fn create_test_service(
    roots: &[String],
) -> (IndexingService, SharedStorage, Arc<Lemmatizer>, TempDir) {
    create_test_service_with(roots, |_| {})
}

/// Like [`create_test_service`], with a hook to adjust the configuration
fn create_test_service_with(
    roots: &[String],
    adjust: impl FnOnce(&mut Config),
) -> (IndexingService, SharedStorage, Arc<Lemmatizer>, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let mut config = create_test_config(roots, &db_path.to_string_lossy());
    adjust(&mut config);

    let storage = open_storage(&db_path).unwrap();
    let lemmatizer = Arc::new(Lemmatizer::new());
    let service = IndexingService::new(config, storage.clone(), lemmatizer.clone()).unwrap();

    (service, storage, lemmatizer, dir)
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.to_string())
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><head><title>Home</title></head><body>
            <p>Welcome to the orchard</p>
            <a href="/page1">One</a>
            <a href="/page1?ref=home">One again</a>
            <a href="/page2">Two</a>
            <a href="/report.pdf">Report</a>
            <a href="/download">Download</a>
            <a href="http://other.test/x">Elsewhere</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_response(
            r#"<html><head><title>Apples</title></head><body>
            <p>An apple a day, apple pie from the orchard</p>
            <a href="/">Home</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_response(
            r#"<html><head><title>Pears</title></head><body>
            <p>Pear trees of the orchard</p>
            <a href="/page1">One</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(vec![0u8; 16]),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (service, storage, lemmatizer, _dir) = create_test_service(&[base_url.clone()]);

    let started = service.start_indexing().await.unwrap();
    assert!(!started.already_running);
    service.wait_for_completion().await.unwrap();
    assert!(!service.is_running());

    {
        let guard = lock_storage(&storage).unwrap();
        let sites = guard.list_sites().unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].status, SiteStatus::Indexed);
        assert_eq!(sites[0].last_error, None);
        assert_eq!(guard.count_pages(sites[0].id).unwrap(), 3);

        assert!(guard
            .find_page_by_path(&format!("{}/download", base_url))
            .unwrap()
            .is_none());

        let orchard = lemmatizer.lemma_of("orchard").unwrap();
        let lemma = guard.find_lemma(sites[0].id, &orchard).unwrap().unwrap();
        assert_eq!(lemma.frequency, 3);
    }

    let engine = SearchEngine::new(storage.clone(), lemmatizer.clone(), SearchConfig::default());

    let response = engine
        .search(&SearchQuery {
            query: "apples".to_string(),
            ..SearchQuery::default()
        })
        .unwrap();
    assert_eq!(response.count, 1);
    let item = &response.items[0];
    assert_eq!(item.uri, "/page1");
    assert_eq!(item.title, "Apples");
    assert_eq!(item.relevance, 1.0);
    assert!(item.snippet.contains("<b>apple</b>"));

    // present on every page, above the 80% presence limit
    let response = engine
        .search(&SearchQuery {
            query: "orchard".to_string(),
            ..SearchQuery::default()
        })
        .unwrap();
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn test_restart_replaces_previous_data() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<html><body><p>Single page</p></body></html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (service, storage, _lemmatizer, _dir) = create_test_service(&[base_url]);

    service.start_indexing().await.unwrap();
    service.wait_for_completion().await.unwrap();
    let first_id = lock_storage(&storage).unwrap().list_sites().unwrap()[0].id;

    service.start_indexing().await.unwrap();
    service.wait_for_completion().await.unwrap();

    let guard = lock_storage(&storage).unwrap();
    let sites = guard.list_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_ne!(sites[0].id, first_id);
    assert_eq!(sites[0].status, SiteStatus::Indexed);
    assert_eq!(guard.count_pages(sites[0].id).unwrap(), 1);
}

#[tokio::test]
async fn test_http_error_root_is_stored_not_indexed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<p>Missing page</p><a href="/hidden">Hidden</a>"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html_response("<p>never linked</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (service, storage, _lemmatizer, _dir) = create_test_service(&[base_url.clone()]);
    service.start_indexing().await.unwrap();
    service.wait_for_completion().await.unwrap();

    let guard = lock_storage(&storage).unwrap();
    let site = &guard.list_sites().unwrap()[0];
    assert_eq!(site.status, SiteStatus::Indexed);

    let page = guard
        .find_page_by_path(&format!("{}/", base_url))
        .unwrap()
        .unwrap();
    assert_eq!(page.code, 404);
    assert_eq!(guard.count_lemmas(site.id).unwrap(), 0);
}

#[tokio::test]
async fn test_stop_leaves_no_indexing_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<p>slow</p>").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let (service, storage, _lemmatizer, _dir) = create_test_service(&[base_url]);

    service.start_indexing().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped = service.stop_indexing().await.unwrap();
    assert!(stopped.was_running);

    {
        let sites = lock_storage(&storage).unwrap().list_sites().unwrap();
        assert_eq!(sites[0].status, SiteStatus::Failed);
        assert_eq!(sites[0].last_error.as_deref(), Some(STOPPED_BY_USER));
    }

    tokio::time::timeout(Duration::from_secs(2), service.wait_for_completion())
        .await
        .expect("run did not unwind after stop")
        .unwrap();
    assert!(!service.is_running());

    let sites = lock_storage(&storage).unwrap().list_sites().unwrap();
    assert!(sites.iter().all(|s| s.status != SiteStatus::Indexing));
    assert_eq!(lock_storage(&storage).unwrap().count_pages(sites[0].id).unwrap(), 0);

    assert!(!service.stop_indexing().await.unwrap().was_running);
}

#[tokio::test]
async fn test_stop_keeps_pages_fetched_before_stop() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<p>Home</p><a href="/a">Fast</a><a href="/b">Slow</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_response("<p>Quince jam</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_response("<p>Quince tart</p>").set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    // /a and /b share one batch
    let (service, storage, lemmatizer, _dir) =
        create_test_service_with(&[base_url.clone()], |config| {
            config.crawler.batch_size = 2;
            config.crawler.max_concurrent_batches = 1;
        });

    service.start_indexing().await.unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(service.stop_indexing().await.unwrap().was_running);

    tokio::time::timeout(Duration::from_secs(3), service.wait_for_completion())
        .await
        .expect("run did not unwind after stop")
        .unwrap();

    let guard = lock_storage(&storage).unwrap();
    let site = &guard.list_sites().unwrap()[0];
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(STOPPED_BY_USER));

    assert_eq!(guard.count_pages(site.id).unwrap(), 2);
    assert!(guard
        .find_page_by_path(&format!("{}/a", base_url))
        .unwrap()
        .is_some());
    assert!(guard
        .find_page_by_path(&format!("{}/b", base_url))
        .unwrap()
        .is_none());

    let quince = lemmatizer.lemma_of("quince").unwrap();
    let lemma = guard.find_lemma(site.id, &quince).unwrap().unwrap();
    assert_eq!(lemma.frequency, 1);
}

#[tokio::test]
async fn test_two_sites_crawled_concurrently() {
    let orchard = MockServer::start().await;
    let garden = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(&format!(
            r#"<p>Orchard harvest</p>
            <a href="/plums">Plums</a>
            <a href="{}/roses">Garden roses</a>"#,
            garden.uri()
        )))
        .expect(1)
        .mount(&orchard)
        .await;

    Mock::given(method("GET"))
        .and(path("/plums"))
        .respond_with(html_response(r#"<p>Plum harvest</p><a href="/">Home</a>"#))
        .expect(1)
        .mount(&orchard)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(&format!(
            r#"<p>Garden harvest</p>
            <a href="/roses">Roses</a>
            <a href="{}/plums">Orchard plums</a>"#,
            orchard.uri()
        )))
        .expect(1)
        .mount(&garden)
        .await;

    Mock::given(method("GET"))
        .and(path("/roses"))
        .respond_with(html_response("<p>Roses bloom</p>"))
        .expect(1)
        .mount(&garden)
        .await;

    let (service, storage, lemmatizer, _dir) =
        create_test_service(&[orchard.uri(), garden.uri()]);

    service.start_indexing().await.unwrap();
    service.wait_for_completion().await.unwrap();

    let guard = lock_storage(&storage).unwrap();
    let orchard_site = guard.find_site_by_url(&orchard.uri()).unwrap().unwrap();
    let garden_site = guard.find_site_by_url(&garden.uri()).unwrap().unwrap();

    for site in [&orchard_site, &garden_site] {
        assert_eq!(site.status, SiteStatus::Indexed);
        assert_eq!(guard.count_pages(site.id).unwrap(), 2);
    }

    // pages belong to the site whose root they fall under
    let roses = guard
        .find_page_by_path(&format!("{}/roses", garden.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(roses.site_id, garden_site.id);
    let plums = guard
        .find_page_by_path(&format!("{}/plums", orchard.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(plums.site_id, orchard_site.id);

    let harvest = lemmatizer.lemma_of("harvest").unwrap();
    let frequency = |site_id| {
        guard
            .find_lemma(site_id, &harvest)
            .unwrap()
            .map(|lemma| lemma.frequency)
    };
    assert_eq!(frequency(orchard_site.id), Some(2));
    assert_eq!(frequency(garden_site.id), Some(1));
}

#[tokio::test]
async fn test_index_page_recovers_error_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html_response(
            "<html><head><title>News</title></head><body><p>Headline today</p></body></html>",
        ))
        .mount(&mock_server)
        .await;

    let (service, storage, lemmatizer, _dir) = create_test_service(&[base_url.clone()]);
    let news_url = format!("{}/news?utm=feed", base_url);
    let headline = lemmatizer.lemma_of("headline").unwrap();

    let outcome = service.index_page(&news_url).await.unwrap();
    assert!(outcome.accepted);
    {
        let guard = lock_storage(&storage).unwrap();
        let site = &guard.list_sites().unwrap()[0];
        assert_eq!(site.status, SiteStatus::Indexed);
        let page = guard
            .find_page_by_path(&format!("{}/news", base_url))
            .unwrap()
            .unwrap();
        assert_eq!(page.code, 500);
        assert!(guard.find_lemma(site.id, &headline).unwrap().is_none());
    }

    assert!(service.index_page(&news_url).await.unwrap().accepted);
    assert!(service.index_page(&news_url).await.unwrap().accepted);

    let guard = lock_storage(&storage).unwrap();
    let site = &guard.list_sites().unwrap()[0];
    let page = guard
        .find_page_by_path(&format!("{}/news", base_url))
        .unwrap()
        .unwrap();
    assert_eq!(page.code, 200);
    let lemma = guard.find_lemma(site.id, &headline).unwrap().unwrap();
    assert_eq!(lemma.frequency, 1);
    // "news", "headline" and "today"
    assert_eq!(guard.postings_for_page(page.id).unwrap().len(), 3);
}
