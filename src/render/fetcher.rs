// src/render/fetcher.rs
// =============================================================================
// Loads a page in the browser and scrolls it until lazy content stops
// appearing.
//
// How a fetch goes:
// 1. Open a session on the URL (bounded by the load timeout)
// 2. If scrolling is wanted: scroll to the bottom, wait a jittered moment,
//    compare the document height before and after
// 3. Height grew -> keep scrolling. Height stayed the same -> "settled":
//    keep a snapshot of the page, then click the "next page" control if the
//    budget allows, else stop
// 4. Return one snapshot per page the browser went through, in order
//
// The whole thing runs under the retry policy, and the session is closed on
// every path out of a single attempt. A failed attempt throws away every
// snapshot it took; the retry starts again from the first page.
// =============================================================================

use super::{RenderSession, Renderer};
use crate::config::Pacing;
use crate::error::FetchError;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use url::Url;

// One listing or detail page as the browser saw it
#[derive(Debug, Clone)]
pub struct RenderedPage {
    // Where the HTML came from; relative links resolve against this
    pub url: Url,
    pub html: String,
}

#[derive(Clone)]
pub struct Fetcher {
    renderer: Arc<dyn Renderer>,
    pacing: Pacing,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(renderer: Arc<dyn Renderer>, pacing: Pacing, retry: RetryPolicy) -> Self {
        Self {
            renderer,
            pacing,
            retry,
        }
    }

    // Renders `url`; with `want_scroll` it also scrolls until settled and
    // follows up to `page_budget` in-page "next" controls.
    //
    // The result is never empty: the first entry is `url` itself, and each
    // further entry is a page reached by clicking "next".
    pub async fn fetch(
        &self,
        url: &Url,
        want_scroll: bool,
        page_budget: u32,
    ) -> Result<Vec<RenderedPage>, FetchError> {
        let label = format!("render {}", url);
        self.retry
            .run(&label, || self.fetch_once(url, want_scroll, page_budget))
            .await
    }

    // A single page as loaded, no scrolling and no page turns
    pub async fn fetch_page(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let mut pages = self.fetch(url, false, 0).await?;
        pages
            .pop()
            .ok_or_else(|| FetchError::Render(format!("nothing rendered for {}", url)))
    }

    async fn fetch_once(
        &self,
        url: &Url,
        want_scroll: bool,
        page_budget: u32,
    ) -> Result<Vec<RenderedPage>, FetchError> {
        let mut session = self.renderer.open(url, self.pacing.load_timeout).await?;

        let outcome = self.settle(session.as_mut(), url, want_scroll, page_budget).await;
        session.close().await;

        outcome
    }

    async fn settle(
        &self,
        session: &mut dyn RenderSession,
        url: &Url,
        want_scroll: bool,
        page_budget: u32,
    ) -> Result<Vec<RenderedPage>, FetchError> {
        let mut pages = Vec::new();

        if want_scroll {
            let mut last_height = session.scroll_height().await?;
            let mut steps = 0;
            let mut settled = false;

            while steps < self.pacing.max_scroll_steps {
                steps += 1;
                session.scroll_to_bottom().await?;
                self.pacing.scroll_settle.sleep().await;

                let new_height = session.scroll_height().await?;
                if new_height != last_height {
                    last_height = new_height;
                    continue;
                }

                if pages.len() as u32 >= page_budget {
                    tracing::debug!("Page budget ({}) reached inside the browser", page_budget);
                    settled = true;
                    break;
                }

                // The browser is about to leave this page
                let current = snapshot(session, url).await?;
                if !session.activate_next(self.pacing.control_timeout).await? {
                    tracing::debug!("No next-page control on {}", current.url);
                    pages.push(current);
                    return Ok(pages);
                }
                tracing::debug!("Clicked through from {}", current.url);
                pages.push(current);

                self.pacing.scroll_settle.sleep().await;
                last_height = session.scroll_height().await?;
            }

            if !settled {
                tracing::warn!(
                    "Page still growing after {} scroll steps; using what has loaded",
                    steps
                );
            }
        }

        pages.push(snapshot(session, url).await?);
        Ok(pages)
    }
}

async fn snapshot(session: &mut dyn RenderSession, fallback: &Url) -> Result<RenderedPage, FetchError> {
    let url = session.current_url().await?.unwrap_or_else(|| fallback.clone());
    let html = session.html().await?;
    Ok(RenderedPage { url, html })
}
