//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve a small encyclopedia and run the whole
//! pipeline against it over real HTTP.

use ency_harvest::config::{load_config, Config};
use ency_harvest::crawler::{ArticleOutcome, FetchError, Pipeline};
use ency_harvest::PipelineStage;
use std::io::Write;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_FLU: &str = r#"
<html><head><title>Flu: MedlinePlus Medical Encyclopedia</title></head>
<body>
  <h1>Flu</h1>
  <div id="ency_summary"><p>The flu is a contagious infection of the nose, throat, and lungs.</p></div>
  <h2>Causes</h2>
  <p>The flu is caused by influenza viruses.</p>
  <h2>Symptoms</h2>
  <p>Symptoms may include: Fever Cough Sore throat</p>
  <ul><li>Body aches</li><li>Fatigue</li></ul>
  <h2>References</h2>
  <p>Someone et al. 2021.</p>
  <h2>Treatment</h2>
  <p>Rest and plenty of fluids.</p>
</body></html>
"#;

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, consumers: usize) -> Config {
    let mut config = Config::default();
    config.source.base_url = format!("{}/ency/", base_url);
    config.crawler.consumers = consumers;
    config.crawler.queue_capacity = 2;
    config.crawler.max_retries = 3;
    config.crawler.backoff_base_ms = 10;
    config.crawler.request_timeout_secs = 5;
    config.crawler.monitor_interval_ms = 20;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config.user_agent.contact_url = "https://example.com/contact".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();
    config
}

fn index_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();
    format!(
        r#"<html><body><ul id="index">{}</ul></body></html>"#,
        items
    )
}

fn find<'a>(outcomes: &'a [ArticleOutcome], url: &str) -> &'a ArticleOutcome {
    outcomes
        .iter()
        .find(|outcome| outcome.url() == url)
        .unwrap_or_else(|| panic!("no outcome for {}", url))
}

async fn mount_article(server: &MockServer, id: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/ency/article/{}.htm", id)))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Index page for A, checked for the polite user agent
    Mock::given(method("GET"))
        .and(path("/ency/encyclopedia_A.htm"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&[
            "article/000001.htm",
            "article/000002.htm",
            "article/000003.htm",
            "encyclopedia_B.htm",
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Index page for B lacks the container
    Mock::given(method("GET"))
        .and(path("/ency/encyclopedia_B.htm"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<ul id="other"><li><a href="article/000009.htm">x</a></li></ul>"#),
        )
        .mount(&mock_server)
        .await;

    mount_article(
        &mock_server,
        "000001",
        ResponseTemplate::new(200).set_body_string(ARTICLE_FLU),
    )
    .await;
    mount_article(
        &mock_server,
        "000002",
        ResponseTemplate::new(200).set_body_string("<html><body><p>No title</p></body></html>"),
    )
    .await;

    // Always failing article: exactly max_retries attempts
    Mock::given(method("GET"))
        .and(path("/ency/article/000003.htm"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut pipeline =
        Pipeline::from_config(create_test_config(&base_url, 1)).expect("Failed to build pipeline");
    let (report, outcomes) = pipeline.collect().await.expect("Harvest failed");

    assert_eq!(pipeline.stage(), PipelineStage::Completed);
    assert_eq!(report.index_pages, 26);
    assert_eq!(report.articles_discovered, 3);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.degraded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.leftover_items, 0);
    assert_eq!(outcomes.len(), 3);

    let flu_url = format!("{}/ency/article/000001.htm", base_url);
    let document = find(&outcomes, &flu_url).document().expect("flu document");
    assert_eq!(document.title, "FLU");
    assert_eq!(
        document.overview.as_deref(),
        Some("The flu is a contagious infection of the nose, throat, and lungs.")
    );
    assert_eq!(document.sections.keys(), vec!["causes", "symptoms", "treatment"]);
    assert_eq!(
        document.sections.get("symptoms"),
        Some("Symptoms may include:\n    • Fever\n    • Cough\n    • Sore throat\n    • Body aches\n    • Fatigue")
    );
    assert_eq!(
        document.sections.get("treatment"),
        Some("Rest and plenty of fluids.")
    );

    let untitled_url = format!("{}/ency/article/000002.htm", base_url);
    assert!(matches!(
        find(&outcomes, &untitled_url),
        ArticleOutcome::Degraded { .. }
    ));

    let failing_url = format!("{}/ency/article/000003.htm", base_url);
    match find(&outcomes, &failing_url) {
        ArticleOutcome::Failed(failure) => {
            assert_eq!(failure.attempts, 3);
            assert!(matches!(
                failure.last_error,
                FetchError::HttpStatus { status: 500, .. }
            ));
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ency/encyclopedia_C.htm"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(index_page(&["article/000100.htm"])),
        )
        .mount(&mock_server)
        .await;

    // First attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/ency/article/000100.htm"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_article(
        &mock_server,
        "000100",
        ResponseTemplate::new(200).set_body_string(ARTICLE_FLU),
    )
    .await;

    let mut pipeline =
        Pipeline::from_config(create_test_config(&base_url, 2)).expect("Failed to build pipeline");
    let (report, outcomes) = pipeline.collect().await.expect("Harvest failed");

    assert_eq!(report.extracted, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].document().map(|d| d.title.as_str()), Some("FLU"));
}

#[tokio::test]
async fn test_backpressure_with_many_articles() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let ids: Vec<String> = (0..12).map(|n| format!("{:06}", 200 + n)).collect();
    let hrefs: Vec<String> = ids.iter().map(|id| format!("article/{}.htm", id)).collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();

    for letter in ['D', 'E'] {
        Mock::given(method("GET"))
            .and(path(format!("/ency/encyclopedia_{}.htm", letter)))
            .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&href_refs)))
            .mount(&mock_server)
            .await;
    }

    for id in &ids {
        mount_article(
            &mock_server,
            id,
            ResponseTemplate::new(200)
                .set_body_string(format!("<h1>Topic {}</h1><h2>Causes</h2><p>Unknown.</p>", id))
                .set_delay(std::time::Duration::from_millis(5)),
        )
        .await;
    }

    let mut pipeline =
        Pipeline::from_config(create_test_config(&base_url, 3)).expect("Failed to build pipeline");
    let (report, outcomes) = pipeline.collect().await.expect("Harvest failed");

    // Both letters list the same twelve pages; each listing is processed
    assert_eq!(report.articles_discovered, 24);
    assert_eq!(report.extracted, 24);
    assert_eq!(outcomes.len(), 24);
    assert_eq!(report.leftover_items, 0);
}

#[tokio::test]
async fn test_unreachable_encyclopedia_completes() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Nothing mounted: every index page answers 404
    let mut pipeline =
        Pipeline::from_config(create_test_config(&base_url, 1)).expect("Failed to build pipeline");
    let (report, outcomes) = pipeline.collect().await.expect("Harvest failed");

    assert_eq!(report.index_pages, 26);
    assert_eq!(report.articles_discovered, 0);
    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_harvest_from_config_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/encyclopedia/encyclopedia_Z.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div id="letters"><a href="topics/zinc.html">Zinc</a><a href="article/1.htm">x</a></div>"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/encyclopedia/topics/zinc.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<h1>Zinc in diet</h1><div id="intro">Zinc is a mineral.</div><h2>Prevention</h2><p>- Eat meat - Eat beans</p>"#,
        ))
        .mount(&mock_server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
queue-capacity = 1
consumers = 1
max-retries = 1
request-timeout-secs = 5

[source]
base-url = "{}/encyclopedia"
index-container-id = "letters"
article-prefix = "topics/"
article-suffix = ".html"
summary-id = "intro"
"#,
        base_url
    )
    .unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).expect("Failed to load config");
    let mut pipeline = Pipeline::from_config(config).expect("Failed to build pipeline");
    let (report, outcomes) = pipeline.collect().await.expect("Harvest failed");

    assert_eq!(report.articles_discovered, 1);
    let document = outcomes[0].document().expect("zinc document");
    assert_eq!(document.title, "ZINC IN DIET");
    assert_eq!(document.overview.as_deref(), Some("Zinc is a mineral."));
    assert_eq!(
        document.sections.get("prevention"),
        Some("    • Eat meat\n    • Eat beans")
    );
}
