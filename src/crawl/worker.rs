// src/crawl/worker.rs
// =============================================================================
// One download worker.
//
// Loop:
// - pull an item from the queue (waits while the queue is empty)
// - a detail link: resolve it to the image URL, download the image, record
//   the outcome, go round again
// - the shutdown signal: hand it on to the next worker, then stop
//
// A worker always finishes the item it holds before it can see the signal,
// and a failed item is recorded, never fatal.
// =============================================================================

use super::queue::{DetailLink, WorkItem, WorkQueue};
use super::report::DownloadOutcome;
use crate::download::ImageWriter;
use crate::extract::{DetailResolver, Resolution};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

// Shared, read-only state every worker needs
pub struct WorkerContext {
    pub resolver: Arc<DetailResolver>,
    pub writer: Arc<ImageWriter>,
    pub target_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct WorkerReport {
    pub outcomes: Vec<DownloadOutcome>,
    pub shutdown_signals: u32,
}

// A detail page and the image it resolved to
struct ResolvedImage {
    source: DetailLink,
    final_url: Url,
}

pub async fn run_worker(id: usize, queue: WorkQueue, ctx: Arc<WorkerContext>) -> WorkerReport {
    let mut report = WorkerReport::default();
    tracing::debug!("Worker {} started", id);

    loop {
        match queue.pop().await {
            Some(WorkItem::Detail(link)) => {
                let outcome = process(&ctx, link).await;
                report.outcomes.push(outcome);
            }
            Some(WorkItem::Shutdown) => {
                report.shutdown_signals += 1;
                queue.push(WorkItem::Shutdown);
                break;
            }
            None => {
                tracing::warn!("Worker {}: queue closed without a shutdown signal", id);
                break;
            }
        }
    }

    tracing::debug!("Worker {} stopped after {} item(s)", id, report.outcomes.len());
    report
}

async fn process(ctx: &WorkerContext, link: DetailLink) -> DownloadOutcome {
    let final_url = match ctx.resolver.resolve(&link.url).await {
        Ok(Resolution::Found(url)) => url,
        Ok(Resolution::NotFound) => return DownloadOutcome::skipped(&link),
        Err(e) => {
            tracing::warn!(
                "Detail page {} (listing page {}) failed: {}",
                link.url,
                link.discovered_from_page,
                e
            );
            return DownloadOutcome::failed(&link, None, e);
        }
    };

    let image = ResolvedImage {
        source: link,
        final_url,
    };

    match ctx.writer.write(&image.final_url, &ctx.target_dir).await {
        Ok(path) => DownloadOutcome::saved(&image.source, &image.final_url, path),
        Err(e) => {
            tracing::warn!(
                "Download of {} (listing page {}) failed: {}",
                image.final_url,
                image.source.discovered_from_page,
                e
            );
            DownloadOutcome::failed(&image.source, Some(&image.final_url), e)
        }
    }
}
