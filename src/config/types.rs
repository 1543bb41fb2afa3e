use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Ency-Harvest
///
/// Every section is optional; a missing section or key falls back to the
/// values used against the live encyclopedia.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Capacity of the bounded work queue
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Number of consumer tasks pulling from the work queue
    pub consumers: usize,

    /// Maximum number of GET attempts per article
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Timeout applied to every single GET (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// How often the queue depth is reported (milliseconds)
    #[serde(rename = "monitor-interval-ms")]
    pub monitor_interval_ms: u64,
}

impl CrawlerConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            consumers: 1,
            max_retries: 3,
            backoff_base_ms: 1000,
            request_timeout_secs: 10,
            monitor_interval_ms: 1000,
        }
    }
}

/// Where the encyclopedia lives and how its pages are laid out
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL the per-letter index pages hang off
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// `id` of the list element holding the article anchors on an index page
    #[serde(rename = "index-container-id")]
    pub index_container_id: String,

    /// Relative href prefix that marks an article link
    #[serde(rename = "article-prefix")]
    pub article_prefix: String,

    /// Suffix every article href ends with
    #[serde(rename = "article-suffix")]
    pub article_suffix: String,

    /// `id` of the element holding an article's summary
    #[serde(rename = "summary-id")]
    pub summary_id: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://medlineplus.gov/ency/".to_string(),
            index_container_id: "index".to_string(),
            article_prefix: "article/".to_string(),
            article_suffix: ".htm".to_string(),
            summary_id: "ency_summary".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "EncyHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/ency-harvest".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}
