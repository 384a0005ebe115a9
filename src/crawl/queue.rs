// src/crawl/queue.rs
// =============================================================================
// The work queue between the page walker (one producer) and the download
// workers (many consumers).
//
// Items are a tagged union: either a detail link to process, or the shutdown
// signal. There is no "empty"/null item; a worker's loop ends only when it
// pulls WorkItem::Shutdown.
//
// Shutdown is a single signal passed along: the coordinator pushes one, each
// worker that pulls it pushes it back once for the next worker and exits.
// Because the queue is FIFO and the signal goes in after the last link, every
// link is taken before any worker sees the signal.
//
// Rust concepts:
// - tokio::sync::mpsc: an async channel; unbounded so the producer never waits
// - Arc<Mutex<Receiver>>: lets many workers share the one receiving end
// =============================================================================

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use url::Url;

// A detail page found on a listing page. The URL is always absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub url: Url,
    pub discovered_from_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Detail(DetailLink),
    Shutdown,
}

#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<WorkItem>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn push(&self, item: WorkItem) {
        // Every clone also owns the receiver, so the channel cannot be closed
        // while we hold `self`
        if let Err(e) = self.tx.send(item) {
            tracing::error!("Work queue closed, dropping {:?}", e.0);
        }
    }

    // Waits until an item is available
    pub async fn pop(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }
}
