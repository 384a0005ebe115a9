// src/extract/detail.rs
// =============================================================================
// Turns a detail page into the URL of the full-size image.
//
// The detail page carries a download button (by default `a.wallpaper__download`).
// Its href, resolved against the detail page, is the final download URL.
//
// Two ways to get the page:
// - a plain HTTP GET (default, cheap)
// - through the browser, for sites that build the button with JavaScript
//
// A page without the button is a normal answer (Resolution::NotFound), not a
// failure, and is never retried. Only network trouble is retried.
// =============================================================================

use super::links::resolve_link;
use crate::config::{Jitter, Pacing, SiteProfile};
use crate::error::FetchError;
use crate::http::{client_headers, HttpGet};
use crate::render::Fetcher;
use crate::retry::RetryPolicy;
use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Url),
    NotFound,
}

enum PageSource {
    Http {
        http: Arc<dyn HttpGet>,
        retry: RetryPolicy,
    },
    // The fetcher carries its own retry policy
    Rendered(Fetcher),
}

pub struct DetailResolver {
    source: PageSource,
    download: Selector,
    throttle: Jitter,
}

impl DetailResolver {
    pub fn over_http(
        http: Arc<dyn HttpGet>,
        site: &SiteProfile,
        pacing: &Pacing,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Self::build(PageSource::Http { http, retry }, site, pacing)
    }

    // Loads detail pages through the browser. Retries are the fetcher's job,
    // so rendered loads are not wrapped a second time.
    pub fn rendered(fetcher: Fetcher, site: &SiteProfile, pacing: &Pacing) -> Result<Self> {
        Self::build(PageSource::Rendered(fetcher), site, pacing)
    }

    fn build(source: PageSource, site: &SiteProfile, pacing: &Pacing) -> Result<Self> {
        let download = Selector::parse(&site.download_selector)
            .map_err(|e| anyhow!("bad download selector '{}': {}", site.download_selector, e))?;

        Ok(Self {
            source,
            download,
            throttle: pacing.resolve_throttle,
        })
    }

    pub async fn resolve(&self, detail_url: &Url) -> Result<Resolution, FetchError> {
        let html = self.load(detail_url).await?;

        match self.find_download_url(&html, detail_url) {
            Some(url) => {
                tracing::debug!("Download button on {} -> {}", detail_url, url);
                Ok(Resolution::Found(url))
            }
            None => {
                tracing::info!("No download button on {}", detail_url);
                Ok(Resolution::NotFound)
            }
        }
    }

    // The download button's target, resolved against the detail page
    pub fn find_download_url(&self, html: &str, detail_url: &Url) -> Option<Url> {
        let document = Html::parse_document(html);

        document
            .select(&self.download)
            .find_map(|a| a.value().attr("href").and_then(|href| resolve_link(detail_url, href)))
    }

    async fn load(&self, detail_url: &Url) -> Result<String, FetchError> {
        match &self.source {
            PageSource::Http { http, retry } => {
                let label = format!("detail page {}", detail_url);
                retry
                    .run(&label, || async move {
                        let result = get_html(http.as_ref(), detail_url).await;
                        // Throttle after every attempt, good or bad
                        self.throttle.sleep().await;
                        result
                    })
                    .await
            }
            PageSource::Rendered(fetcher) => {
                let page = fetcher.fetch_page(detail_url).await;
                self.throttle.sleep().await;
                Ok(page?.html)
            }
        }
    }
}

async fn get_html(http: &dyn HttpGet, url: &Url) -> Result<String, FetchError> {
    http.get(url, client_headers())
        .await?
        .error_for_status(url)?
        .text()
        .await
}
