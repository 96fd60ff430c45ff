//! Integration tests for the crawler
//!
//! Most tests crawl a static in-memory link graph through mock fetch and
//! parse collaborators; the last ones use wiremock to run the real HTTP
//! fetcher and HTML parser end-to-end.

mod support;

use site_harvest::config::{CrawlerConfig, Traversal, UserAgentConfig};
use site_harvest::crawler::{Coordinator, CrawlReport, Fetcher, HtmlParser, HttpFetcher};
use site_harvest::ledger::{DedupLedger, SqliteLedger};
use site_harvest::store::{ContentStore, SqliteContentStore};
use site_harvest::HarvestError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use support::{url, FailingLedger, Graph, GraphFetcher, GraphParser, MemoryStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(max_links: i64, max_depth: i64, max_threads: u32) -> CrawlerConfig {
    let mut settings = CrawlerConfig::new(url("/"));
    settings.max_links = max_links;
    settings.max_depth = max_depth;
    settings.max_threads = max_threads;
    settings
}

fn coordinator(
    graph: &Arc<Graph>,
    fetcher: &Arc<GraphFetcher>,
    ledger: &Arc<DedupLedger>,
    settings: CrawlerConfig,
) -> Coordinator {
    Coordinator::new(
        settings,
        Arc::clone(fetcher) as Arc<dyn Fetcher>,
        Arc::new(GraphParser::new(Arc::clone(graph))),
        Arc::clone(ledger),
    )
    .expect("valid settings")
}

/// Crawls `graph` with an in-memory ledger
async fn crawl(graph: Graph, settings: CrawlerConfig) -> (CrawlReport, Arc<GraphFetcher>) {
    let graph = Arc::new(graph);
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::in_memory());
    let report = coordinator(&graph, &fetcher, &ledger, settings)
        .run()
        .await
        .expect("crawl succeeds");
    (report, fetcher)
}

fn urls(report: &CrawlReport) -> Vec<String> {
    report.results.iter().map(|r| r.url.clone()).collect()
}

fn url_set(report: &CrawlReport) -> BTreeSet<String> {
    report.results.iter().map(|r| r.url.clone()).collect()
}

fn diamond() -> Graph {
    Graph::new()
        .page("/", &["/b", "/c"])
        .page("/b", &["/d"])
        .page("/c", &["/d"])
        .page("/d", &[])
}

#[tokio::test]
async fn test_diamond_visits_shared_page_once() {
    for threads in [1, 2, 8] {
        let (report, fetcher) = crawl(diamond(), settings(10, 2, threads)).await;

        assert_eq!(report.results.len(), 4, "threads = {}", threads);
        assert_eq!(fetcher.fetch_count("/d"), 1, "threads = {}", threads);
        assert_eq!(fetcher.max_fetches_per_url(), 1);
        assert_eq!(report.summary.links_followed, 3);
        assert_eq!(report.summary.rejected.already_seen, 1);
    }
}

#[tokio::test]
async fn test_depth_limit_stops_chain() {
    let graph = Graph::new()
        .page("/", &["/b"])
        .page("/b", &["/c"])
        .page("/c", &[]);

    let (report, fetcher) = crawl(graph, settings(10, 1, 2)).await;

    assert_eq!(urls(&report), vec![url("/"), url("/b")]);
    assert_eq!(fetcher.fetch_count("/c"), 0);
    assert_eq!(report.summary.rejected.too_deep, 1);
}

#[tokio::test]
async fn test_zero_link_budget_fetches_only_seed() {
    let graph = Graph::new()
        .page("/", &["/b", "/c"])
        .page("/b", &[])
        .page("/c", &[]);

    let (report, fetcher) = crawl(graph, settings(0, 5, 4)).await;

    assert_eq!(urls(&report), vec![url("/")]);
    assert_eq!(fetcher.total_fetches(), 1);
    assert_eq!(report.summary.links_followed, 0);
    assert_eq!(report.summary.rejected.budget_exhausted, 2);
}

#[tokio::test]
async fn test_seed_fetch_failure_is_reported() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)).failing("/"));
    let ledger = Arc::new(DedupLedger::in_memory());

    let err = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 4))
        .run()
        .await
        .unwrap_err();

    match err {
        HarvestError::SeedUnavailable { url: seed, source } => {
            assert_eq!(seed, url("/"));
            assert!(matches!(*source, HarvestError::Fetch { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(fetcher.total_fetches(), 1);
}

#[tokio::test]
async fn test_page_failures_are_skipped() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)).failing("/b"));
    let ledger = Arc::new(DedupLedger::in_memory());

    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 1))
        .run()
        .await
        .unwrap();

    // D is still reached through C
    assert_eq!(url_set(&report).len(), 3);
    assert!(url_set(&report).contains(&url("/d")));
    assert_eq!(report.summary.fetch_failures, 1);
    assert_eq!(fetcher.fetch_count("/b"), 1);
}

#[tokio::test]
async fn test_budgets_hold_under_concurrency() {
    let (report, fetcher) = crawl(Graph::layered(4, 12), settings(25, 3, 8)).await;

    assert!(report.results.len() <= 26);
    assert!(report.results.iter().all(|r| r.depth <= 3));
    assert_eq!(report.summary.links_followed, 25);
    assert_eq!(fetcher.total_fetches(), 26);
    assert_eq!(fetcher.max_fetches_per_url(), 1);
}

#[tokio::test]
async fn test_last_budget_unit_is_taken_once() {
    let links: Vec<String> = (0..100).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let mut graph = Graph::new().page("/", &link_refs);
    for link in &links {
        graph = graph.page(link, &link_refs);
    }

    let graph = Arc::new(graph);
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::in_memory());
    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 3, 8))
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 11);
    assert_eq!(ledger.claimed_url_count(), 11);
    assert_eq!(report.summary.links_followed, 10);
}

#[tokio::test]
async fn test_single_worker_is_deterministic() {
    let (first, _) = crawl(Graph::layered(3, 4), settings(12, 3, 1)).await;
    let (second, _) = crawl(Graph::layered(3, 4), settings(12, 3, 1)).await;

    assert_eq!(urls(&first), urls(&second));
    assert_eq!(first.results, second.results);
    // Breadth-first: depths never decrease
    assert!(first.results.windows(2).all(|w| w[0].depth <= w[1].depth));
}

#[tokio::test]
async fn test_result_set_independent_of_pool_size() {
    let (sequential, _) = crawl(Graph::layered(4, 5), settings(1000, 3, 1)).await;
    assert_eq!(sequential.results.len(), 1 + 5 * 3);

    for threads in [2, 8] {
        let (concurrent, fetcher) = crawl(Graph::layered(4, 5), settings(1000, 3, threads)).await;
        assert_eq!(url_set(&concurrent), url_set(&sequential), "threads = {}", threads);
        assert_eq!(fetcher.max_fetches_per_url(), 1);
    }
}

#[tokio::test]
async fn test_depth_first_order() {
    let mut settings = settings(10, 2, 1);
    settings.traversal = Traversal::DepthFirst;

    let (report, _) = crawl(diamond(), settings).await;

    assert_eq!(
        urls(&report),
        vec![url("/"), url("/c"), url("/d"), url("/b")]
    );
}

#[tokio::test]
async fn test_duplicate_content_is_not_emitted_or_expanded() {
    let graph = Graph::new()
        .page("/", &["/b", "/c"])
        .page_with_text("/b", "same words", &[])
        .page_with_text("/c", "same words", &["/e"])
        .page("/e", &[]);

    let (report, fetcher) = crawl(graph, settings(10, 3, 1)).await;

    assert_eq!(urls(&report), vec![url("/"), url("/b")]);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(fetcher.fetch_count("/c"), 1);
    assert_eq!(fetcher.fetch_count("/e"), 0);
}

#[tokio::test]
async fn test_results_are_stored() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::in_memory());
    let store = Arc::new(MemoryStore::default());

    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 4))
        .with_content_store(Arc::clone(&store) as Arc<dyn ContentStore>)
        .run()
        .await
        .unwrap();

    assert_eq!(store.len(), 4);
    assert_eq!(report.summary.pages_stored, 4);
}

#[tokio::test]
async fn test_store_failure_keeps_results() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::in_memory());

    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 2))
        .with_content_store(Arc::new(MemoryStore::broken()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.summary.store_failures, 4);
    assert_eq!(report.summary.pages_stored, 0);
}

#[tokio::test]
async fn test_skip_storage_never_calls_store() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::in_memory());
    let store = Arc::new(MemoryStore::default());

    let mut settings = settings(10, 2, 2);
    settings.skip_storage = true;

    let report = coordinator(&graph, &fetcher, &ledger, settings)
        .with_content_store(Arc::clone(&store) as Arc<dyn ContentStore>)
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn test_stop_then_resume_fetches_each_page_once() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("ledger.db");

    let graph = Arc::new(
        Graph::new()
            .page("/", &["/b1", "/b2", "/b3", "/b4", "/b5"])
            .page("/b1", &[])
            .page("/b2", &[])
            .page("/b3", &[])
            .page("/b4", &[])
            .page("/b5", &[]),
    );
    let fetcher = Arc::new(
        GraphFetcher::new(Arc::clone(&graph)).with_delay(Duration::from_millis(50)),
    );

    // First run: stop as soon as the seed has been crawled
    let ledger = Arc::new(DedupLedger::with_store(Box::new(
        SqliteLedger::new(&ledger_path).unwrap(),
    )));
    let first = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 1));
    let stop = first.stop_handle();
    let mut stream = first.stream();

    let mut seen = BTreeSet::new();
    let seed = stream.next().await.unwrap();
    assert_eq!(seed.url, url("/"));
    seen.insert(seed.url);
    stop.stop();
    while let Some(result) = stream.next().await {
        seen.insert(result.url);
    }
    let summary = stream.finish().await.unwrap();
    assert!(summary.stopped_early);
    assert!(summary.pending > 0);
    drop(ledger);

    // Second run picks up the checkpoint in a fresh ledger instance
    let ledger = Arc::new(DedupLedger::with_store(Box::new(
        SqliteLedger::new(&ledger_path).unwrap(),
    )));
    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 1))
        .run()
        .await
        .unwrap();
    assert!(report.summary.resumed);
    assert!(!report.summary.stopped_early);
    seen.extend(urls(&report));

    assert_eq!(seen.len(), 6);
    assert_eq!(fetcher.max_fetches_per_url(), 1);
    assert_eq!(fetcher.total_fetches(), 6);
    assert!(ledger.load_frontier().is_empty());
}

#[tokio::test]
async fn test_rerun_against_same_ledger_emits_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("ledger.db");
    let graph = Arc::new(diamond());

    let open = || {
        Arc::new(DedupLedger::with_store(Box::new(
            SqliteLedger::new(&ledger_path).unwrap(),
        )))
    };

    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let first = coordinator(&graph, &fetcher, &open(), settings(10, 2, 2))
        .run()
        .await
        .unwrap();
    assert_eq!(first.results.len(), 4);

    // The seed is fetched again, but its content was already stored
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let second = coordinator(&graph, &fetcher, &open(), settings(10, 2, 2))
        .run()
        .await
        .unwrap();
    assert!(second.results.is_empty());
    assert_eq!(second.summary.duplicates, 1);
    assert_eq!(fetcher.total_fetches(), 1);
}

#[tokio::test]
async fn test_dropped_stream_stops_fetching() {
    let links: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let mut graph = Graph::new().page("/", &link_refs);
    for link in &links {
        graph = graph.page(link, &[]);
    }

    let graph = Arc::new(graph);
    let fetcher = Arc::new(
        GraphFetcher::new(Arc::clone(&graph)).with_delay(Duration::from_millis(20)),
    );
    let ledger = Arc::new(DedupLedger::with_store(Box::new(
        SqliteLedger::new_in_memory().unwrap(),
    )));

    let mut stream = coordinator(&graph, &fetcher, &ledger, settings(50, 2, 2)).stream();
    let seed = stream.next().await.unwrap();
    assert_eq!(seed.url, url("/"));
    drop(stream);

    // Only pages already in flight when the stream was dropped complete
    tokio::time::sleep(Duration::from_millis(300)).await;
    let fetched = fetcher.total_fetches();
    assert!(fetched <= 3, "{} pages fetched after drop", fetched);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetcher.total_fetches(), fetched);

    // The rest is checkpointed for the next run
    assert_eq!(ledger.load_frontier().len() + fetched, 21);
}

#[tokio::test]
async fn test_crawl_survives_ledger_failure() {
    let graph = Arc::new(diamond());
    let fetcher = Arc::new(GraphFetcher::new(Arc::clone(&graph)));
    let ledger = Arc::new(DedupLedger::with_store(Box::new(FailingLedger)));

    let report = coordinator(&graph, &fetcher, &ledger, settings(10, 2, 4))
        .run()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(fetcher.fetch_count("/d"), 1);
    assert_eq!(fetcher.max_fetches_per_url(), 1);
    assert_eq!(report.summary.rejected.already_seen, 1);
    assert!(report.summary.ledger_degraded);
    assert!(ledger.is_degraded());
}

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestHarvester".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
                <p>Welcome home.</p>
                <a href="/about">About</a>
                <a href="/missing">Missing</a>
                <a href="https://elsewhere.test/">Elsewhere</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(
            r#"<html><head><title>About</title></head><body>
                <p>About us.</p>
                <a href="/">Home</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteContentStore::new_in_memory().unwrap());
    let fetcher = HttpFetcher::new(&user_agent(), Duration::from_secs(5)).unwrap();

    let mut settings = CrawlerConfig::new(format!("{}/", base_url));
    settings.max_depth = 2;
    settings.max_threads = 2;

    let report = Coordinator::new(
        settings,
        Arc::new(fetcher),
        Arc::new(HtmlParser::new()),
        Arc::new(DedupLedger::in_memory()),
    )
    .unwrap()
    .with_content_store(Arc::clone(&store) as Arc<dyn ContentStore>)
    .run()
    .await
    .unwrap();

    let titles: BTreeSet<String> = report.results.iter().map(|r| r.title.clone()).collect();
    assert_eq!(
        titles,
        BTreeSet::from(["About".to_string(), "Home".to_string()])
    );
    assert_eq!(report.summary.fetch_failures, 1);
    assert_eq!(report.summary.rejected.out_of_scope, 1);
    assert_eq!(report.summary.rejected.already_seen, 1);
    assert_eq!(store.count_pages().unwrap(), 2);

    let home = store
        .get_page(&format!("{}/", base_url))
        .unwrap()
        .expect("home page stored");
    assert_eq!(home.content, "Welcome home.");
}

#[tokio::test]
async fn test_seed_not_html_is_fatal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&user_agent(), Duration::from_secs(5)).unwrap();
    let err = Coordinator::new(
        CrawlerConfig::new(format!("{}/", mock_server.uri())),
        Arc::new(fetcher),
        Arc::new(HtmlParser::new()),
        Arc::new(DedupLedger::in_memory()),
    )
    .unwrap()
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, HarvestError::SeedUnavailable { .. }));
}
