// src/render/chrome.rs
// =============================================================================
// Renderer backed by a locally launched Chrome, driven over CDP with
// chromiumoxide.
//
// Every open() launches its own browser and every close() tears it down
// again. That is slower than sharing one browser, but a crashed or wedged page
// can never poison the next request, and workers never share a session.
// =============================================================================

use super::{RenderSession, Renderer};
use crate::error::FetchError;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

// How often we look for the "next page" control while waiting for it
const CONTROL_POLL: Duration = Duration::from_millis(250);

pub struct ChromeRenderer {
    headless: bool,
    next_xpath: String,
}

impl ChromeRenderer {
    pub fn new(headless: bool, next_page_labels: &[String]) -> Self {
        Self {
            headless,
            next_xpath: next_control_xpath(next_page_labels),
        }
    }
}

// XPath for a "next page" anchor: rel="next", or link text in any locale
fn next_control_xpath(labels: &[String]) -> String {
    let mut conditions =
        vec!["contains(concat(' ', normalize-space(@rel), ' '), ' next ')".to_string()];
    for label in labels {
        // Labels are plain words; quotes would break the XPath literal
        let label = label.replace('\'', "");
        conditions.push(format!("contains(text(), '{}')", label));
    }
    format!("//a[{}]", conditions.join(" or "))
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn open(
        &self,
        url: &Url,
        load_timeout: Duration,
    ) -> Result<Box<dyn RenderSession>, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(load_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", BROWSER_USER_AGENT));
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(FetchError::Render)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(FetchError::render)?;

        // The CDP handler has to be polled for the browser to make progress
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromeSession {
            browser,
            page: None,
            events,
            next_xpath: self.next_xpath.clone(),
        };

        match session.load(url, load_timeout).await {
            Ok(()) => Ok(Box::new(session)),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }
}

struct ChromeSession {
    browser: Browser,
    page: Option<Page>,
    events: JoinHandle<()>,
    next_xpath: String,
}

impl ChromeSession {
    async fn load(&mut self, url: &Url, load_timeout: Duration) -> Result<(), FetchError> {
        tracing::debug!("Loading {} in browser", url);

        let page = tokio::time::timeout(load_timeout, self.browser.new_page(url.as_str()))
            .await
            .map_err(|_| FetchError::Timeout(load_timeout, "page load"))?
            .map_err(FetchError::render)?;

        tokio::time::timeout(load_timeout, page.find_element("body"))
            .await
            .map_err(|_| FetchError::Timeout(load_timeout, "document body"))?
            .map_err(FetchError::render)?;

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, FetchError> {
        self.page
            .as_ref()
            .ok_or_else(|| FetchError::Render("no page loaded".to_string()))
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn scroll_height(&mut self) -> Result<i64, FetchError> {
        self.page()?
            .evaluate("document.documentElement.scrollHeight")
            .await
            .map_err(FetchError::render)?
            .into_value::<i64>()
            .map_err(FetchError::render)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.page()?
            .evaluate("window.scrollTo(0, document.documentElement.scrollHeight); true")
            .await
            .map_err(FetchError::render)?;
        Ok(())
    }

    async fn activate_next(&mut self, wait: Duration) -> Result<bool, FetchError> {
        let page = self.page()?;
        let xpath = self.next_xpath.as_str();

        let search = async {
            loop {
                if let Ok(element) = page.find_xpath(xpath).await {
                    return element;
                }
                tokio::time::sleep(CONTROL_POLL).await;
            }
        };

        let element = match tokio::time::timeout(wait, search).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };

        element.click().await.map_err(FetchError::render)?;
        Ok(true)
    }

    async fn html(&mut self) -> Result<String, FetchError> {
        self.page()?.content().await.map_err(FetchError::render)
    }

    async fn current_url(&mut self) -> Result<Option<Url>, FetchError> {
        let url = self.page()?.url().await.map_err(FetchError::render)?;
        Ok(url.and_then(|u| Url::parse(&u).ok()))
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Closing page failed: {}", e);
            }
        }
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Closing browser failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        self.events.abort();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.events.abort();
    }
}
