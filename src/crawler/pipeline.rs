//! Pipeline orchestration
//!
//! This module contains the run loop that ties the pieces together:
//! - Generating and filtering the per-letter index URLs
//! - One discovery task per letter feeding the bounded work queue
//! - Consumers draining the queue through the fetch-and-extract handler
//! - A queue depth monitor for the duration of discovery
//! - Sending the single shutdown marker once every discovery task has joined

use crate::config::Config;
use crate::crawler::consumer::{article_handler, run_consumer, ArticleOutcome, ConsumerTally};
use crate::crawler::discovery::discover;
use crate::crawler::fetcher::{HttpTransport, ReqwestTransport, RetryPolicy};
use crate::crawler::monitor::DepthMonitor;
use crate::crawler::queue::{ArticleHandler, QueueError, QueueMessage, WorkItem, WorkQueue};
use crate::output::RunReport;
use crate::state::PipelineStage;
use crate::url::{filter_valid_urls, generate_index_urls, IndexUrl};
use crate::HarvestError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Main pipeline structure
///
/// A pipeline runs once; its stage only moves forward.
pub struct Pipeline<T: HttpTransport + 'static> {
    config: Arc<Config>,
    transport: Arc<T>,
    stage: PipelineStage,
}

impl Pipeline<ReqwestTransport> {
    /// Creates a pipeline that talks to the network through reqwest
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let transport = ReqwestTransport::from_config(&config.user_agent)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: HttpTransport + 'static> Pipeline<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(config: Config, transport: Arc<T>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            stage: PipelineStage::GeneratingUrls,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn advance(&mut self, to: PipelineStage) -> crate::Result<()> {
        if !self.stage.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.stage,
                to,
            });
        }

        tracing::info!("Pipeline stage: {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Builds the index URLs this run will discover from
    pub fn index_urls(&self) -> Vec<IndexUrl> {
        filter_valid_urls(generate_index_urls(&self.config.source.base_url))
    }

    /// Runs the pipeline to completion
    ///
    /// Every article outcome is sent to `sink` as soon as a consumer produces
    /// it. Per-article failures show up there; only protocol violations and
    /// panicked tasks end the run with an error.
    ///
    /// # Arguments
    ///
    /// * `sink` - Receives one [`ArticleOutcome`] per discovered article
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Counts for the completed run
    /// * `Err(HarvestError::InvalidTransition)` - The pipeline already ran
    /// * `Err(HarvestError)` - A queue protocol violation or a failed task
    pub async fn run(
        &mut self,
        sink: mpsc::UnboundedSender<ArticleOutcome>,
    ) -> crate::Result<RunReport> {
        if self.stage != PipelineStage::GeneratingUrls {
            return Err(HarvestError::InvalidTransition {
                from: self.stage,
                to: PipelineStage::GeneratingUrls,
            });
        }

        let started_at = Utc::now();
        let crawler = &self.config.crawler;

        let index_urls = self.index_urls();
        tracing::info!(
            "Generated {} valid index URLs from {}",
            index_urls.len(),
            self.config.source.base_url
        );

        let queue = WorkQueue::new(crawler.queue_capacity);
        let handler = article_handler(
            Arc::clone(&self.transport),
            RetryPolicy::from_config(crawler),
            self.config.source.summary_id.as_str(),
        );

        let monitor = DepthMonitor::spawn(queue.clone(), crawler.monitor_interval());
        let consumers: Vec<JoinHandle<Result<ConsumerTally, QueueError>>> = (0..crawler
            .consumers
            .max(1))
            .map(|id| tokio::spawn(run_consumer(id, queue.clone(), sink.clone())))
            .collect();
        drop(sink);

        self.advance(PipelineStage::Discovering)?;

        let mut discovery = JoinSet::new();
        for index in index_urls.iter().cloned() {
            discovery.spawn(produce_links(
                Arc::clone(&self.transport),
                Arc::clone(&self.config),
                index,
                queue.clone(),
                handler.clone(),
            ));
        }

        let articles_discovered = match join_discovery(&mut discovery).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Discovery failed: {}", e);
                monitor.stop().await;
                for consumer in &consumers {
                    consumer.abort();
                }
                return Err(e);
            }
        };

        self.advance(PipelineStage::Draining)?;
        monitor.stop().await;
        queue.shutdown().await?;

        let tally = join_consumers(consumers).await?;

        self.advance(PipelineStage::Completed)?;
        let leftover_items = drain_leftovers(&queue);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            index_pages: index_urls.len(),
            articles_discovered,
            extracted: tally.extracted,
            degraded: tally.degraded,
            failed: tally.failed,
            leftover_items,
        };

        tracing::info!(
            "Harvest completed: {} articles ({} extracted, {} degraded, {} failed)",
            report.processed(),
            report.extracted,
            report.degraded,
            report.failed
        );

        Ok(report)
    }

    /// Runs the pipeline and collects every outcome in arrival order
    pub async fn collect(&mut self) -> crate::Result<(RunReport, Vec<ArticleOutcome>)> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = self.run(tx).await?;

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        Ok((report, outcomes))
    }
}

/// Discovers one letter's articles and enqueues them in page order
async fn produce_links<T: HttpTransport>(
    transport: Arc<T>,
    config: Arc<Config>,
    index: IndexUrl,
    queue: WorkQueue,
    handler: ArticleHandler,
) -> Result<usize, QueueError> {
    let links = discover(
        transport.as_ref(),
        &index,
        &config.source,
        config.crawler.request_timeout(),
    )
    .await;
    let count = links.len();

    for link in links {
        tracing::debug!("Queueing {} (letter {})", link, index.letter);
        queue.put(WorkItem::new(link, handler.clone())).await?;
    }

    Ok(count)
}

/// Waits for every discovery task and sums the links they enqueued
async fn join_discovery(
    discovery: &mut JoinSet<Result<usize, QueueError>>,
) -> crate::Result<usize> {
    let mut total = 0;

    while let Some(joined) = discovery.join_next().await {
        total += joined??;
    }

    Ok(total)
}

/// Waits for every consumer and merges their tallies
///
/// The first failed consumer ends the wait; the ones still running are aborted.
async fn join_consumers(
    consumers: Vec<JoinHandle<Result<ConsumerTally, QueueError>>>,
) -> crate::Result<ConsumerTally> {
    let mut tally = ConsumerTally::default();
    let mut remaining = consumers.into_iter();

    while let Some(consumer) = remaining.next() {
        let joined = match consumer.await {
            Ok(result) => result.map_err(HarvestError::from),
            Err(e) => Err(HarvestError::from(e)),
        };

        match joined {
            Ok(consumer_tally) => tally.merge(consumer_tally),
            Err(e) => {
                tracing::error!("Consumer failed: {}", e);
                for rest in remaining {
                    rest.abort();
                }
                return Err(e);
            }
        }
    }

    Ok(tally)
}

/// Empties the queue after the consumers stopped, skipping the shutdown marker
fn drain_leftovers(queue: &WorkQueue) -> usize {
    let mut leftover = 0;

    while let Some(message) = queue.try_get() {
        if let QueueMessage::Work(item) = message {
            tracing::warn!("Unprocessed work item left in queue: {}", item.url);
            leftover += 1;
        }
    }

    leftover
}
