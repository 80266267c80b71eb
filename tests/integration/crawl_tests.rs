//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use email_harvester::config::{
    Config, CrawlerConfig, DatabaseConfig, InputConfig, OutputConfig, ProcessingConfig,
    UserAgentConfig,
};
use email_harvester::crawler::{run_batch_with_storage, Coordinator, EmailSet, Website};
use email_harvester::storage::{
    EmailStore, SqliteStorage, StorageResult, WebsiteRecord, WebsiteSource,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawler configuration with the given bounds
fn create_crawler_config(max_links_per_page: u32, max_depth: u32) -> CrawlerConfig {
    CrawlerConfig {
        workers: 4,
        max_links_per_page,
        max_depth,
        max_concurrent_fetches: 8,
        max_active_roots: 0,
        request_timeout_secs: 5,
        skip_domains: vec![],
        skip_email_patterns: vec![],
        priority_keywords: vec![
            "contact".to_string(),
            "email".to_string(),
            "about".to_string(),
        ],
    }
}

fn create_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Mounts an HTML page that must be requested exactly `times` times
async fn mount_page(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn root_of(server: &MockServer) -> Website {
    Website::parse(None, &format!("{}/", server.uri())).expect("mock server URL")
}

fn as_vec(emails: &EmailSet) -> Vec<&str> {
    emails.iter().map(String::as_str).collect()
}

fn create_batch_config(input: InputConfig, output: OutputConfig, batch_size: u32) -> Config {
    Config {
        crawler: create_crawler_config(5, 1),
        user_agent: create_user_agent(),
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        input,
        output,
        processing: ProcessingConfig {
            batch_size,
            start_offset: 0,
            report_interval_ms: 0,
        },
    }
}

/// Website source and e-mail store kept entirely in memory
#[derive(Default)]
struct MemoryStore {
    websites: Vec<WebsiteRecord>,
    stored: Vec<(String, String)>,
}

impl WebsiteSource for MemoryStore {
    fn fetch_batch(&self, offset: u64, limit: u32) -> StorageResult<Vec<WebsiteRecord>> {
        Ok(self
            .websites
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

impl EmailStore for MemoryStore {
    fn update_emails(&mut self, id: &str, emails: &str) -> StorageResult<usize> {
        self.stored.push((id.to_string(), emails.to_string()));
        Ok(1)
    }
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_discovery_order_and_no_duplicates() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><body>
            <p>Contact us: a@ex.com or b@ex.com</p>
            <p>Again: a@ex.com</p>
            <a href="mailto:c@ex.com">Mail</a>
            <a href="/about">About</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/about", "<p>Team: d@ex.com and b@ex.com</p>", 1).await;

    let coordinator = Coordinator::new(&create_crawler_config(5, 1), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["c@ex.com", "a@ex.com", "b@ex.com", "d@ex.com"]);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_links_fetched_once() {
    let server = MockServer::start().await;

    let mut root = String::from("<html><body>");
    for i in 0..5 {
        root.push_str(&format!(r#"<a href="/contact">Contact {}</a>"#, i));
        root.push_str(&format!(r##"<a href="/contact#form{}">Form</a>"##, i));
    }
    root.push_str(&format!(r#"<a href="{}/contact/">Absolute</a>"#, server.uri()));
    root.push_str("</body></html>");

    mount_page(&server, "/", &root, 1).await;
    mount_page(
        &server,
        "/contact",
        r#"<p>hello@ex.com</p><a href="/">Home</a><a href="/contact">Self</a>"#,
        1,
    )
    .await;

    let coordinator = Coordinator::new(&create_crawler_config(20, 3), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["hello@ex.com"]);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_link_budget_respected() {
    let server = MockServer::start().await;

    let mut root = String::from("<html><body>");
    for i in 0..10 {
        root.push_str(&format!(r#"<a href="/p{}">Page {}</a>"#, i, i));
    }
    root.push_str(r#"<a href="/contact-us">Contact</a>"#);
    root.push_str("</body></html>");
    mount_page(&server, "/", &root, 1).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>nothing</p>"))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(&create_crawler_config(3, 1), &create_user_agent()).unwrap();
    coordinator.crawl(root_of(&server)).await.unwrap();

    let paths = requested_paths(&server).await;
    assert_eq!(paths.len(), 4, "root plus three children, got {:?}", paths);
    assert!(paths.contains(&"/contact-us".to_string()));
    assert!(paths.contains(&"/p0".to_string()));
    assert!(paths.contains(&"/p1".to_string()));
    assert!(!paths.contains(&"/p2".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_bound_respected() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<p>r@ex.com</p><a href="/a">A</a>"#, 1).await;
    mount_page(&server, "/a", r#"<p>a@ex.com</p><a href="/b">B</a>"#, 1).await;
    mount_page(&server, "/b", r#"<p>b@ex.com</p><a href="/c">C</a>"#, 1).await;
    mount_page(&server, "/c", r#"<p>c@ex.com</p>"#, 0).await;

    let coordinator = Coordinator::new(&create_crawler_config(5, 2), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["r@ex.com", "a@ex.com", "b@ex.com"]);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_depth_fetches_only_root() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<p>r@ex.com</p><a href="/contact">C</a>"#, 1).await;
    mount_page(&server, "/contact", "<p>c@ex.com</p>", 0).await;

    let coordinator = Coordinator::new(&create_crawler_config(5, 0), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["r@ex.com"]);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_children_joined_in_spawn_order() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/slow">Slow</a><a href="/fast">Fast</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>slow@ex.com</p>")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/fast", "<p>fast@ex.com</p>", 1).await;

    let coordinator = Coordinator::new(&create_crawler_config(5, 1), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["slow@ex.com", "fast@ex.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_skip_email_pattern() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<p>info@example.com</p><p>sales@ex.com</p><a href="mailto:noreply@example.com">x</a>"#,
        1,
    )
    .await;

    let mut crawler = create_crawler_config(5, 1);
    crawler.skip_email_patterns = vec![r".*@example\.com".to_string()];

    let coordinator = Coordinator::new(&crawler, &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["sales@ex.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_off_site_and_skipped_links_not_followed() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<a href="http://other.invalid/contact">Off-site</a>
               <a href="//localhost:{}/cdn">CDN</a>
               <a href="team.html">Relative</a>
               <a href="javascript:void(0)">JS</a>
               <a href="/about">About</a>"#,
            port
        ),
        1,
    )
    .await;
    mount_page(&server, "/about", "<p>about@ex.com</p>", 1).await;
    mount_page(&server, "/cdn", "<p>cdn@ex.com</p>", 0).await;
    mount_page(&server, "/team.html", "<p>team@ex.com</p>", 0).await;

    let mut crawler = create_crawler_config(10, 1);
    crawler.skip_domains = vec!["localhost".to_string()];

    let coordinator = Coordinator::new(&crawler, &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["about@ex.com"]);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_protocol_relative_links_stay_in_host_family() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let other_port = url::Url::parse(&other.uri()).unwrap().port().unwrap();

    // The root is served from 127.0.0.1, so 127.0.0.1 on another port is in
    // the family and localhost is not.
    mount_page(
        &server,
        "/",
        &format!(
            r#"<a href="//localhost:{port}/share">Share</a>
               <a href="//127.0.0.1:{port}/cdn">CDN</a>"#,
            port = other_port
        ),
        1,
    )
    .await;
    mount_page(&other, "/share", "<p>stranger@other.org</p>", 0).await;
    mount_page(&other, "/cdn", "<p>cdn@ex.com</p>", 1).await;

    let coordinator = Coordinator::new(&create_crawler_config(10, 1), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["cdn@ex.com"]);
    assert_eq!(requested_paths(&other).await, vec!["/cdn"]);
    server.verify().await;
    other.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_pages_are_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<p>Down? ops@ex.com</p>"))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(&create_crawler_config(5, 1), &create_user_agent()).unwrap();
    let emails = coordinator.crawl(root_of(&server)).await.unwrap();

    assert_eq!(as_vec(&emails), vec!["ops@ex.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_once_callback_per_root() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_page(&first, "/", r#"<p>one@ex.com</p><a href="/about">A</a>"#, 1).await;
    mount_page(&first, "/about", r#"<p>about@ex.com</p>"#, 1).await;
    mount_page(&second, "/", r#"<p>nothing here</p>"#, 1).await;

    let calls: Arc<Mutex<Vec<(Website, EmailSet)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let calls = calls.clone();
        Arc::new(move |website: &Website, emails: &EmailSet| {
            calls.lock().unwrap().push((website.clone(), emails.clone()));
        })
    };

    let coordinator = Coordinator::new(&create_crawler_config(5, 1), &create_user_agent()).unwrap();
    let unreachable = Website::parse(Some("dead".to_string()), "http://127.0.0.1:9/").unwrap();

    coordinator.submit_with(root_of(&first), sink.clone()).unwrap();
    coordinator.submit_with(root_of(&second), sink.clone()).unwrap();
    coordinator.submit_with(unreachable.clone(), sink).unwrap();

    assert!(coordinator.await_idle(Duration::from_secs(30)).await);
    coordinator.shutdown();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);

    let result_for = |website: &Website| -> Vec<String> {
        let matching: Vec<_> = calls.iter().filter(|(w, _)| w == website).collect();
        assert_eq!(matching.len(), 1, "callback count for {}", website.url);
        matching[0].1.iter().cloned().collect()
    };

    assert_eq!(result_for(&root_of(&first)), vec!["one@ex.com", "about@ex.com"]);
    assert!(result_for(&root_of(&second)).is_empty());
    assert!(result_for(&unreachable).is_empty());

    let stats = coordinator.statistics().snapshot();
    assert_eq!(stats.website.attempts, 3);
    assert_eq!(stats.callback.successes, 3);
    assert!(coordinator.pool_state().is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_root_yields_empty_result() {
    let coordinator = Coordinator::new(&create_crawler_config(5, 2), &create_user_agent()).unwrap();
    let website = Website::parse(None, "http://127.0.0.1:9/").unwrap();

    let emails = coordinator.crawl(website).await.unwrap();

    assert!(emails.is_empty());
    let stats = coordinator.statistics().snapshot();
    assert_eq!(stats.fetch.attempts, 1);
    assert_eq!(stats.fetch.successes, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crawl_batch_returns_map() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_page(&first, "/", "<p>first@ex.com</p>", 1).await;
    mount_page(&second, "/", "<p>second@ex.com</p>", 1).await;

    let first_url = format!("{}/", first.uri());
    let second_url = format!("{}/", second.uri());

    let coordinator = Coordinator::new(&create_crawler_config(5, 1), &create_user_agent()).unwrap();
    let results = coordinator
        .crawl_batch(&[
            second_url.clone(),
            "not a url".to_string(),
            first_url.clone(),
            second_url.clone(),
        ])
        .await
        .unwrap();

    let keys: Vec<&String> = results.keys().collect();
    assert_eq!(keys, vec![&second_url, &first_url]);
    assert_eq!(as_vec(&results[&first_url]), vec!["first@ex.com"]);
    assert_eq!(as_vec(&results[&second_url]), vec!["second@ex.com"]);
    first.verify().await;
    second.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backpressure_with_single_active_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>x@ex.com</p>")
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let mut crawler = create_crawler_config(5, 1);
    crawler.max_active_roots = 1;
    let coordinator = Coordinator::new(&crawler, &create_user_agent()).unwrap();

    let completed = Arc::new(Mutex::new(0usize));
    let sink = {
        let completed = completed.clone();
        Arc::new(move |_: &Website, _: &EmailSet| {
            *completed.lock().unwrap() += 1;
        })
    };

    for i in 0..4 {
        let website = Website::parse(None, &format!("{}/root{}", server.uri(), i)).unwrap();
        coordinator.submit_with(website, sink.clone()).unwrap();
    }

    assert!(coordinator.pool_state().active_roots <= 1);

    tokio::time::timeout(Duration::from_secs(10), coordinator.await_queue_below(1))
        .await
        .expect("queue drained");
    assert!(coordinator.await_idle(Duration::from_secs(10)).await);

    assert_eq!(*completed.lock().unwrap(), 4);
    let state = coordinator.pool_state();
    assert_eq!(state.queued_roots, 0);
    assert_eq!(state.active_roots, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_driver_stores_truncated_results() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>a@ex.com bb@ex.com ccc@ex.com</p>", 1).await;

    let quiet = MockServer::start().await;
    mount_page(&quiet, "/", "<p>no addresses</p>", 1).await;

    let input = InputConfig {
        table: "companies".to_string(),
        id_field: "id".to_string(),
        url_field: "website".to_string(),
    };
    let output = OutputConfig {
        table: "companies".to_string(),
        id_field: "id".to_string(),
        emails_field: "emails".to_string(),
        emails_field_length: 20,
    };

    let storage = SqliteStorage::new_in_memory(&input, &output).unwrap();
    storage
        .connection()
        .execute_batch(&format!(
            "INSERT INTO companies (id, website) VALUES ('1', '{}/');
             INSERT INTO companies (id, website) VALUES ('2', 'not a url');
             INSERT INTO companies (id, website) VALUES ('3', '{}/');",
            server.uri(),
            quiet.uri()
        ))
        .unwrap();
    let storage = Arc::new(Mutex::new(storage));

    let config = create_batch_config(input, output, 2);

    let summary = run_batch_with_storage(&config, storage.clone()).await.unwrap();

    assert_eq!(summary.websites_read, 3);
    assert_eq!(summary.websites_submitted, 2);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.results_stored, 1);

    let storage = storage.lock().unwrap();
    let stored: Vec<(String, Option<String>)> = storage
        .connection()
        .prepare("SELECT id, emails FROM companies ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        stored,
        vec![
            ("1".to_string(), Some("a@ex.com,bb@ex.com".to_string())),
            ("2".to_string(), None),
            ("3".to_string(), None),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_driver_with_custom_store() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>info@ex.com</p>", 1).await;

    let store = MemoryStore {
        websites: vec![
            WebsiteRecord {
                id: Some("7".to_string()),
                url: format!("{}/", server.uri()),
            },
            WebsiteRecord {
                id: Some("8".to_string()),
                url: "not a url".to_string(),
            },
        ],
        ..Default::default()
    };
    let store = Arc::new(Mutex::new(store));

    let input = InputConfig {
        table: "sites".to_string(),
        id_field: "id".to_string(),
        url_field: "url".to_string(),
    };
    let output = OutputConfig {
        table: "sites".to_string(),
        id_field: "id".to_string(),
        emails_field: "emails".to_string(),
        emails_field_length: 255,
    };
    let config = create_batch_config(input, output, 1);

    let summary = run_batch_with_storage(&config, store.clone()).await.unwrap();

    assert_eq!(summary.websites_read, 2);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.results_stored, 1);
    assert_eq!(
        store.lock().unwrap().stored,
        vec![("7".to_string(), "info@ex.com".to_string())]
    );
}
