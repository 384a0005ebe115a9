// src/crawl/pipeline.rs
// =============================================================================
// The coordinator: walks the listing pages and keeps the workers fed.
//
// A session goes through four states:
// 1. Init        - create the queue, start a fixed pool of idle workers
// 2. Paginating  - fetch a listing page, queue every detail link not seen
//                  before, move to the next page. Stop when a page has no
//                  detail links, there is no next page, or the page budget
//                  is used up
// 3. Draining    - push the shutdown signal, wait for every worker to exit
// 4. Done        - hand back the session report
//
// Pages are walked one after another: everything found on page N is queued
// before anything from page N+1. When the browser clicks through several
// pages in one fetch, each of them counts against the page budget and each
// of them is scanned for links. Only this task touches the `seen` set, so it
// needs no lock.
// =============================================================================

use super::queue::{DetailLink, WorkItem, WorkQueue};
use super::report::{SessionReport, StopReason};
use super::worker::{run_worker, WorkerContext};
use crate::config::{HarvestConfig, Jitter};
use crate::download::{ImageWriter, WriteLock};
use crate::extract::{DetailResolver, LinkExtractor};
use crate::http::HttpGet;
use crate::render::{Fetcher, RenderedPage, Renderer};
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

// One listing page to fetch
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: Url,
    pub page_index: u32,
    // "next" controls the browser may still click on its own
    pub page_budget: u32,
}

struct Pagination {
    pages_fetched: u32,
    links_found: usize,
    stop_reason: StopReason,
    error: Option<String>,
}

pub struct Coordinator {
    fetcher: Fetcher,
    extractor: LinkExtractor,
    worker_ctx: Arc<WorkerContext>,
    workers: usize,
    page_budget: u32,
    want_scroll: bool,
    page_turn: Jitter,
}

impl Coordinator {
    // Wires the whole pipeline from a validated config and the two
    // capabilities it talks through
    pub fn from_config(
        config: &HarvestConfig,
        renderer: Arc<dyn Renderer>,
        http: Arc<dyn HttpGet>,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(renderer, config.pacing, config.retry);

        let resolver = if config.browser.render_details {
            DetailResolver::rendered(fetcher.clone(), &config.site, &config.pacing)?
        } else {
            DetailResolver::over_http(http.clone(), &config.site, &config.pacing, config.retry)?
        };

        let writer = ImageWriter::new(http, WriteLock::new(), &config.pacing, config.retry);

        Ok(Self {
            fetcher,
            extractor: LinkExtractor::new(&config.site)?,
            worker_ctx: Arc::new(WorkerContext {
                resolver: Arc::new(resolver),
                writer: Arc::new(writer),
                target_dir: config.target_dir.clone(),
            }),
            workers: config.workers.max(1),
            page_budget: config.page_budget.max(1),
            want_scroll: config.want_scroll,
            page_turn: config.pacing.page_turn,
        })
    }

    pub async fn run(&self, start_url: &Url) -> SessionReport {
        // Init
        let queue = WorkQueue::new();
        let handles: Vec<_> = (0..self.workers)
            .map(|id| tokio::spawn(run_worker(id, queue.clone(), self.worker_ctx.clone())))
            .collect();
        tracing::info!("Started {} worker(s)", self.workers);

        // Paginating
        let pagination = self.paginate(start_url, &queue).await;

        // Draining
        tracing::info!(
            "Pagination finished ({:?}); waiting for workers to drain the queue",
            pagination.stop_reason
        );
        queue.push(WorkItem::Shutdown);

        let mut outcomes = Vec::new();
        let mut shutdown_signals = 0;
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => {
                    shutdown_signals += report.shutdown_signals;
                    outcomes.extend(report.outcomes);
                }
                Err(e) => tracing::error!("Worker {} died: {}", id, e),
            }
        }

        // Done
        SessionReport {
            start_url: start_url.to_string(),
            pages_fetched: pagination.pages_fetched,
            links_found: pagination.links_found,
            stop_reason: pagination.stop_reason,
            pagination_error: pagination.error,
            workers: self.workers,
            shutdown_signals,
            outcomes,
        }
    }

    async fn paginate(&self, start_url: &Url, queue: &WorkQueue) -> Pagination {
        let mut seen: HashSet<Url> = HashSet::new();
        let mut current = start_url.clone();
        let mut pages_used = 0u32;

        let (stop_reason, error) = 'walk: loop {
            let request = PageRequest {
                url: current.clone(),
                page_index: pages_used + 1,
                page_budget: self.page_budget - pages_used - 1,
            };
            tracing::info!("Listing page {}: {}", request.page_index, request.url);

            let pages = match self
                .fetcher
                .fetch(&request.url, self.want_scroll, request.page_budget)
                .await
            {
                Ok(pages) => pages,
                Err(e) => {
                    tracing::error!("Could not load listing page {}: {}", request.url, e);
                    break (StopReason::FetchFailed, Some(e.to_string()));
                }
            };

            // One entry per page the browser went through, oldest first
            for page in &pages {
                pages_used += 1;
                if !self.enqueue_links(page, pages_used, &mut seen, queue) {
                    break 'walk (StopReason::NoDetailLinks, None);
                }
            }

            if pages_used >= self.page_budget {
                break (StopReason::PageBudget, None);
            }

            let Some(last) = pages.last() else {
                break (StopReason::NoNextPage, None);
            };
            match self.extractor.extract_next_page(&last.html, &last.url) {
                Some(next) => current = next,
                None => break (StopReason::NoNextPage, None),
            }

            self.page_turn.sleep().await;
        };

        Pagination {
            pages_fetched: pages_used,
            links_found: seen.len(),
            stop_reason,
            error,
        }
    }

    // Queues the detail links of one listing page that were not seen before.
    // Returns false when the page had none at all.
    fn enqueue_links(
        &self,
        page: &RenderedPage,
        page_index: u32,
        seen: &mut HashSet<Url>,
        queue: &WorkQueue,
    ) -> bool {
        let links = self.extractor.extract_detail_links(&page.html, &page.url);
        if links.is_empty() {
            tracing::warn!(
                "No detail links on {}; the page did not load or its layout changed",
                page.url
            );
            return false;
        }

        let total = links.len();
        let mut fresh = 0;
        for url in links {
            if seen.insert(url.clone()) {
                queue.push(WorkItem::Detail(DetailLink {
                    url,
                    discovered_from_page: page_index,
                }));
                fresh += 1;
            }
        }
        tracing::info!(
            "Page {} ({}): queued {} new of {} detail link(s)",
            page_index,
            page.url,
            fresh,
            total
        );
        true
    }
}
