//! Bounded work queue shared by discovery tasks and consumers
//!
//! The queue is a bounded tokio mpsc channel whose receiver sits behind an
//! async mutex, so any number of consumers can pull from it and each message is
//! delivered to exactly one of them. `put` suspends while the queue is full and
//! `get` suspends while it is empty.
//!
//! Completion is signalled with [`QueueMessage::Shutdown`], sent once through
//! [`WorkQueue::shutdown`] after every producer has finished. A consumer that
//! receives it puts it back with [`WorkQueue::forward_shutdown`] so the other
//! consumers see it too.

use crate::crawler::ArticleOutcome;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Future returned by an [`ArticleHandler`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = ArticleOutcome> + Send>>;

/// The fetch-and-extract pipeline a work item is run through
pub type ArticleHandler = Arc<dyn Fn(String) -> HandlerFuture + Send + Sync>;

/// One article still to be fetched and extracted
#[derive(Clone)]
pub struct WorkItem {
    /// Absolute article URL
    pub url: String,

    /// Pipeline that turns the URL into an outcome
    pub handler: ArticleHandler,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, handler: ArticleHandler) -> Self {
        Self {
            url: url.into(),
            handler,
        }
    }

    /// Runs the item's handler on its URL
    pub async fn run(self) -> ArticleOutcome {
        (self.handler)(self.url).await
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem").field("url", &self.url).finish()
    }
}

/// What travels through the queue
#[derive(Debug, Clone)]
pub enum QueueMessage {
    Work(WorkItem),

    /// No more work will ever be enqueued
    Shutdown,
}

/// Misuse of the queue protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,

    #[error("shutdown was already sent")]
    ShutdownAlreadySent,

    #[error("work item {0} enqueued after shutdown")]
    PutAfterShutdown(String),
}

/// Bounded FIFO of [`QueueMessage`]s
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<QueueMessage>,
    rx: Arc<Mutex<mpsc::Receiver<QueueMessage>>>,
    /// Held while a message claims its slot, so no work can follow the marker
    shutdown_sent: Arc<std::sync::Mutex<bool>>,
    dequeued: Arc<AtomicUsize>,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` messages (at least 1)
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            shutdown_sent: Arc::new(std::sync::Mutex::new(false)),
            dequeued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueues a work item, waiting while the queue is full
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The item is queued ahead of any shutdown marker
    /// * `Err(QueueError::PutAfterShutdown)` - Shutdown was already sent
    /// * `Err(QueueError::Closed)` - The queue was torn down
    pub async fn put(&self, item: WorkItem) -> Result<(), QueueError> {
        if self.is_shut_down() {
            return Err(QueueError::PutAfterShutdown(item.url));
        }

        let permit = self.tx.reserve().await.map_err(|_| QueueError::Closed)?;

        // The flag is checked and the slot filled under one guard
        let shutdown_sent = self.shutdown_flag();
        if *shutdown_sent {
            return Err(QueueError::PutAfterShutdown(item.url));
        }
        permit.send(QueueMessage::Work(item));
        Ok(())
    }

    /// Enqueues the one and only shutdown marker
    ///
    /// A second call is a protocol violation.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        if self.is_shut_down() {
            return Err(QueueError::ShutdownAlreadySent);
        }

        let permit = self.tx.reserve().await.map_err(|_| QueueError::Closed)?;

        let mut shutdown_sent = self.shutdown_flag();
        if *shutdown_sent {
            return Err(QueueError::ShutdownAlreadySent);
        }
        *shutdown_sent = true;
        permit.send(QueueMessage::Shutdown);
        Ok(())
    }

    fn shutdown_flag(&self) -> MutexGuard<'_, bool> {
        self.shutdown_sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts a received shutdown marker back for the next consumer
    pub async fn forward_shutdown(&self) -> Result<(), QueueError> {
        debug_assert!(self.is_shut_down());
        self.tx
            .send(QueueMessage::Shutdown)
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Dequeues the next message, waiting while the queue is empty
    pub async fn get(&self) -> QueueMessage {
        let message = self.rx.lock().await.recv().await;

        match message {
            Some(QueueMessage::Work(item)) => {
                self.dequeued.fetch_add(1, Ordering::SeqCst);
                QueueMessage::Work(item)
            }
            // The queue keeps its own sender, so a closed channel only means teardown
            Some(QueueMessage::Shutdown) | None => QueueMessage::Shutdown,
        }
    }

    /// Dequeues the next message if one is ready
    pub fn try_get(&self) -> Option<QueueMessage> {
        let mut rx = self.rx.try_lock().ok()?;
        let message = rx.try_recv().ok()?;

        if matches!(message, QueueMessage::Work(_)) {
            self.dequeued.fetch_add(1, Ordering::SeqCst);
        }
        Some(message)
    }

    /// Number of messages currently waiting
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_flag()
    }

    /// Work items handed out so far
    pub fn dequeued(&self) -> usize {
        self.dequeued.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("depth", &self.depth())
            .field("capacity", &self.capacity())
            .field("shutdown_sent", &self.is_shut_down())
            .finish()
    }
}
