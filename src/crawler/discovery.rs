//! Article link discovery
//!
//! This module handles one index page:
//! - Fetching it once (index pages are never retried)
//! - Finding the anchor list container by its `id`
//! - Keeping the hrefs that look like article pages and resolving them

use crate::config::SourceConfig;
use crate::crawler::fetcher::{fetch_once, FetchError, HttpTransport};
use crate::url::{resolve_article_url, IndexUrl};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Reasons an index page yields no links
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("failed to fetch index page: {0}")]
    Fetch(#[from] FetchError),

    #[error("index page {url} has no element with id '{container_id}'")]
    MissingContainer { url: String, container_id: String },

    #[error("invalid index URL {0}")]
    InvalidIndexUrl(String),
}

/// Extracts article links from an index page body
///
/// # Link Extraction Rules
///
/// **Include:** `<a href>` inside the element whose `id` is
/// `source.index_container_id`, when the href starts with
/// `source.article_prefix` and ends with `source.article_suffix`.
///
/// **Exclude:** anchors outside the container and every other href.
///
/// Links are returned in page order, resolved against `index_url`.
///
/// # Arguments
///
/// * `html` - Body of the index page
/// * `index_url` - URL the page was fetched from
/// * `source` - Container id and article link pattern
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Absolute article URLs, possibly empty
/// * `Err(DiscoveryError::MissingContainer)` - No element has the container id
///
/// # Example
///
/// ```
/// use ency_harvest::config::SourceConfig;
/// use ency_harvest::crawler::parse_index_links;
/// use url::Url;
///
/// let html = r#"<ul id="index"><li><a href="article/000147.htm">Flu</a></li></ul>"#;
/// let index = Url::parse("https://medlineplus.gov/ency/encyclopedia_F.htm").unwrap();
/// let links = parse_index_links(html, &index, &SourceConfig::default()).unwrap();
/// assert_eq!(links, vec!["https://medlineplus.gov/ency/article/000147.htm"]);
/// ```
pub fn parse_index_links(
    html: &str,
    index_url: &Url,
    source: &SourceConfig,
) -> Result<Vec<String>, DiscoveryError> {
    let document = Html::parse_document(html);

    let container = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().id() == Some(source.index_container_id.as_str()))
        .ok_or_else(|| DiscoveryError::MissingContainer {
            url: index_url.to_string(),
            container_id: source.index_container_id.clone(),
        })?;

    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in container.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();

            if !href.starts_with(&source.article_prefix) || !href.ends_with(&source.article_suffix)
            {
                continue;
            }

            if let Some(absolute_url) = resolve_article_url(href, index_url) {
                links.push(absolute_url);
            }
        }
    }

    Ok(links)
}

/// Fetches one index page and returns the article links on it
pub async fn fetch_index_links<T: HttpTransport>(
    transport: &T,
    index: &IndexUrl,
    source: &SourceConfig,
    timeout: Duration,
) -> Result<Vec<String>, DiscoveryError> {
    let index_url =
        Url::parse(&index.url).map_err(|_| DiscoveryError::InvalidIndexUrl(index.url.clone()))?;

    let body = fetch_once(transport, &index.url, timeout).await?;
    parse_index_links(&body, &index_url, source)
}

/// Discovers the article links for one letter
///
/// Every failure is logged and treated as "no links"; discovery never fails
/// the run.
pub async fn discover<T: HttpTransport>(
    transport: &T,
    index: &IndexUrl,
    source: &SourceConfig,
    timeout: Duration,
) -> Vec<String> {
    match fetch_index_links(transport, index, source, timeout).await {
        Ok(links) => {
            tracing::info!(
                "Discovered {} articles for letter {} ({})",
                links.len(),
                index.letter,
                index.url
            );
            links
        }
        Err(e) => {
            tracing::warn!("No articles discovered for letter {}: {}", index.letter, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::ScriptedTransport;

    const INDEX: &str = "https://medlineplus.gov/ency/encyclopedia_A.htm";

    fn index_url() -> Url {
        Url::parse(INDEX).unwrap()
    }

    fn index() -> IndexUrl {
        IndexUrl {
            letter: 'A',
            url: INDEX.to_string(),
        }
    }

    #[test]
    fn test_keeps_article_links_in_order() {
        let html = r#"
            <html><body>
            <ul id="index">
                <li><a href="article/000002.htm">Abscess</a></li>
                <li><a href="article/000001.htm">Acne</a></li>
            </ul>
            </body></html>
        "#;
        let links = parse_index_links(html, &index_url(), &SourceConfig::default()).unwrap();
        assert_eq!(
            links,
            vec![
                "https://medlineplus.gov/ency/article/000002.htm",
                "https://medlineplus.gov/ency/article/000001.htm",
            ]
        );
    }

    #[test]
    fn test_skips_non_article_links() {
        let html = r#"
            <ul id="index">
                <li><a href="article/000001.htm">Acne</a></li>
                <li><a href="encyclopedia_B.htm">B</a></li>
                <li><a href="article/000003.pdf">PDF</a></li>
                <li><a href="https://other.example.com/article/1.htm">Other</a></li>
                <li><a>No href</a></li>
            </ul>
        "#;
        let links = parse_index_links(html, &index_url(), &SourceConfig::default()).unwrap();
        assert_eq!(links, vec!["https://medlineplus.gov/ency/article/000001.htm"]);
    }

    #[test]
    fn test_ignores_anchors_outside_container() {
        let html = r#"
            <a href="article/999999.htm">Featured</a>
            <ul id="index"><li><a href="article/000001.htm">Acne</a></li></ul>
        "#;
        let links = parse_index_links(html, &index_url(), &SourceConfig::default()).unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_missing_container() {
        let html = r#"<ul id="other"><li><a href="article/000001.htm">Acne</a></li></ul>"#;
        let result = parse_index_links(html, &index_url(), &SourceConfig::default());
        assert!(matches!(
            result,
            Err(DiscoveryError::MissingContainer { .. })
        ));
    }

    #[test]
    fn test_custom_layout() {
        let source = SourceConfig {
            index_container_id: "letters".to_string(),
            article_prefix: "topics/".to_string(),
            article_suffix: ".html".to_string(),
            ..SourceConfig::default()
        };
        let html = r#"<div id="letters"><a href="topics/flu.html">Flu</a><a href="article/1.htm">x</a></div>"#;
        let links = parse_index_links(html, &index_url(), &source).unwrap();
        assert_eq!(links, vec!["https://medlineplus.gov/ency/topics/flu.html"]);
    }

    #[tokio::test]
    async fn test_discover_fetches_once() {
        let transport = ScriptedTransport::new();
        transport.push_ok(
            INDEX,
            r#"<ul id="index"><li><a href="article/000001.htm">Acne</a></li></ul>"#,
        );

        let links = discover(
            &transport,
            &index(),
            &SourceConfig::default(),
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(links, vec!["https://medlineplus.gov/ency/article/000001.htm"]);
        assert_eq!(transport.call_count(INDEX), 1);
    }

    #[tokio::test]
    async fn test_discover_failure_is_empty_and_not_retried() {
        let transport = ScriptedTransport::new();
        transport.push_status(INDEX, 503);

        let links = discover(
            &transport,
            &index(),
            &SourceConfig::default(),
            Duration::from_secs(10),
        )
        .await;
        assert!(links.is_empty());
        assert_eq!(transport.call_count(INDEX), 1);
    }

    #[tokio::test]
    async fn test_fetch_index_links_reports_status() {
        let transport = ScriptedTransport::new();
        transport.push_status(INDEX, 404);

        let result = fetch_index_links(
            &transport,
            &index(),
            &SourceConfig::default(),
            Duration::from_secs(10),
        )
        .await;
        assert!(matches!(
            result,
            Err(DiscoveryError::Fetch(FetchError::HttpStatus { status: 404, .. }))
        ));
    }
}
