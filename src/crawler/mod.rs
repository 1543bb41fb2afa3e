//! Crawler module for article discovery and extraction
//!
//! This module contains the core pipeline, including:
//! - HTTP fetching with bounded retry and exponential backoff
//! - Article link discovery on the per-letter index pages
//! - The bounded work queue and its shutdown protocol
//! - Consumers running the fetch-and-extract handler
//! - HTML to [`Document`] extraction
//! - Overall run orchestration

mod consumer;
mod discovery;
mod extractor;
mod fetcher;
mod monitor;
mod pipeline;
mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer::{article_handler, process_article, run_consumer, ArticleOutcome, ConsumerTally};
pub use discovery::{discover, fetch_index_links, parse_index_links, DiscoveryError};
pub use extractor::{
    extract, extract_html, is_allowed_header, normalize_text, Document, ExtractError, Section,
    Sections, BULLET, SECTION_ALLOW_LIST,
};
pub use fetcher::{
    build_http_client, fetch_once, fetch_with_retry, FetchError, HttpTransport, RawPage,
    ReqwestTransport, RetryPolicy, TerminalFailure, TransportError,
};
pub use monitor::DepthMonitor;
pub use pipeline::Pipeline;
pub use queue::{ArticleHandler, HandlerFuture, QueueError, QueueMessage, WorkItem, WorkQueue};

use crate::config::Config;
use crate::output::RunReport;
use tokio::sync::mpsc;

/// Runs a complete harvest against the live encyclopedia
///
/// This is the main entry point. It will:
/// 1. Build the HTTP client
/// 2. Generate the per-letter index URLs
/// 3. Discover articles and queue them
/// 4. Fetch and extract every article, sending outcomes to `sink`
/// 5. Shut the consumers down once discovery is over
///
/// # Arguments
///
/// * `config` - Validated harvest configuration
/// * `sink` - Receives one [`ArticleOutcome`] per discovered article
///
/// # Returns
///
/// * `Ok(RunReport)` - Counts and timings for the finished run
/// * `Err(HarvestError)` - The HTTP client could not be built or the run broke
///   the queue protocol
///
/// # Example
///
/// ```no_run
/// use ency_harvest::config::Config;
/// use ency_harvest::crawler::{harvest, ArticleOutcome};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ArticleOutcome>();
/// let printer = tokio::spawn(async move {
///     while let Some(outcome) = rx.recv().await {
///         println!("{}", outcome.render());
///     }
/// });
/// let report = harvest(Config::default(), tx).await?;
/// printer.await?;
/// println!("{} articles", report.processed());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(
    config: Config,
    sink: mpsc::UnboundedSender<ArticleOutcome>,
) -> crate::Result<RunReport> {
    Pipeline::from_config(config)?.run(sink).await
}
