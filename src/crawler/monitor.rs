//! Periodic queue depth reporting

use crate::crawler::queue::WorkQueue;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Background task logging the work queue depth at a fixed interval
///
/// It only reads the queue, so stopping it at any point has no effect on the
/// pipeline.
#[derive(Debug)]
pub struct DepthMonitor {
    handle: JoinHandle<()>,
}

impl DepthMonitor {
    pub fn spawn(queue: WorkQueue, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                tracing::info!(
                    "Current queue size: {}/{}",
                    queue.depth(),
                    queue.capacity()
                );
            }
        });

        Self { handle }
    }

    /// Cancels the monitor; cancellation is not an error
    pub async fn stop(self) {
        self.handle.abort();

        match self.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!("Queue monitor ended abnormally: {}", e),
        }
    }
}
