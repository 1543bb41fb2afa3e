//! Consumers and the article handler they run
//!
//! A consumer pulls work items until it sees the shutdown marker, runs each
//! item's handler and forwards the resulting [`ArticleOutcome`] downstream.
//! Exactly one outcome is produced per work item, so a bad page never costs
//! more than its own result.

use crate::crawler::extractor::{extract_html, Document, ExtractError};
use crate::crawler::fetcher::{fetch_with_retry, HttpTransport, RetryPolicy, TerminalFailure};
use crate::crawler::queue::{ArticleHandler, HandlerFuture, QueueError, QueueMessage, WorkQueue};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of processing one article URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// The page was fetched and turned into a document
    Extracted { url: String, document: Document },

    /// The page was fetched but could not be structured
    Degraded { url: String, reason: ExtractError },

    /// Every fetch attempt failed
    Failed(TerminalFailure),
}

impl ArticleOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Extracted { url, .. } | Self::Degraded { url, .. } => url,
            Self::Failed(failure) => &failure.url,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Extracted { document, .. } => Some(document),
            _ => None,
        }
    }

    /// Renders the outcome as the text block printed for it
    pub fn render(&self) -> String {
        match self {
            Self::Extracted { document, .. } => document.render(),
            Self::Degraded { url, reason } => {
                format!("Could not extract article {}: {}", url, reason)
            }
            Self::Failed(failure) => format!(
                "Failed to retrieve {} after {} attempts: {}",
                failure.url, failure.attempts, failure.last_error
            ),
        }
    }
}

/// Fetches one article with retries and extracts it
pub async fn process_article<T: HttpTransport>(
    transport: &T,
    url: String,
    policy: &RetryPolicy,
    summary_id: &str,
) -> ArticleOutcome {
    let body = match fetch_with_retry(transport, &url, policy).await {
        Ok(body) => body,
        Err(failure) => return ArticleOutcome::Failed(failure),
    };

    match extract_html(&body, summary_id) {
        Ok(document) => ArticleOutcome::Extracted { url, document },
        Err(reason) => {
            tracing::warn!("Degraded document for {}: {}", url, reason);
            ArticleOutcome::Degraded { url, reason }
        }
    }
}

/// Builds the handler attached to every work item
pub fn article_handler<T>(
    transport: Arc<T>,
    policy: RetryPolicy,
    summary_id: impl Into<Arc<str>>,
) -> ArticleHandler
where
    T: HttpTransport + 'static,
{
    let summary_id = summary_id.into();

    Arc::new(move |url: String| -> HandlerFuture {
        let transport = Arc::clone(&transport);
        let summary_id = Arc::clone(&summary_id);
        Box::pin(async move { process_article(transport.as_ref(), url, &policy, &summary_id).await })
    })
}

/// Per-consumer outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerTally {
    pub extracted: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl ConsumerTally {
    pub fn record(&mut self, outcome: &ArticleOutcome) {
        match outcome {
            ArticleOutcome::Extracted { .. } => self.extracted += 1,
            ArticleOutcome::Degraded { .. } => self.degraded += 1,
            ArticleOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: ConsumerTally) {
        self.extracted += other.extracted;
        self.degraded += other.degraded;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.extracted + self.degraded + self.failed
    }
}

/// Pulls work items until the shutdown marker arrives
///
/// The marker is put back before returning so that sibling consumers stop too.
/// No `get` is issued after the marker has been seen.
pub async fn run_consumer(
    id: usize,
    queue: WorkQueue,
    sink: mpsc::UnboundedSender<ArticleOutcome>,
) -> Result<ConsumerTally, QueueError> {
    let mut tally = ConsumerTally::default();

    loop {
        match queue.get().await {
            QueueMessage::Work(item) => {
                tracing::debug!("Consumer {} processing {}", id, item.url);
                let outcome = item.run().await;
                tally.record(&outcome);

                if let Err(unsent) = sink.send(outcome) {
                    tracing::debug!(
                        "Consumer {}: outcome receiver gone, dropping result for {}",
                        id,
                        unsent.0.url()
                    );
                }
            }
            QueueMessage::Shutdown => {
                queue.forward_shutdown().await?;
                tracing::debug!("Consumer {} stopping after {} items", id, tally.total());
                return Ok(tally);
            }
        }
    }
}
