// src/testing.rs
// =============================================================================
// In-memory stand-ins for the browser and the network, shared by the tests of
// several modules. Only compiled for `cargo test`.
// =============================================================================

use crate::error::FetchError;
use crate::http::{HttpGet, HttpResponse};
use crate::render::{RenderSession, Renderer};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakePage {
    html: String,
    growth_steps: u32,
    next: Option<String>,
    broken_scroll: bool,
}

impl FakePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            growth_steps: 0,
            next: None,
            broken_scroll: false,
        }
    }

    // The document grows on each of the first `steps` scrolls
    pub fn growing(mut self, steps: u32) -> Self {
        self.growth_steps = steps;
        self
    }

    // Clicking "next" on this page navigates to `url`
    pub fn next(mut self, url: &str) -> Self {
        self.next = Some(url.to_string());
        self
    }

    pub fn broken_scroll(mut self) -> Self {
        self.broken_scroll = true;
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub opens: usize,
    pub closes: usize,
    pub scrolls: usize,
    pub clicks: usize,
}

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    scrolls: AtomicUsize,
    clicks: AtomicUsize,
    failing_opens: AtomicU32,
}

#[derive(Default)]
pub struct FakeRenderer {
    pages: HashMap<String, FakePage>,
    counters: Arc<Counters>,
    opened: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    // The first `n` opens fail with a render error
    pub fn failing_opens(self, n: u32) -> Self {
        self.counters.failing_opens.store(n, Ordering::SeqCst);
        self
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            opens: self.counters.opens.load(Ordering::SeqCst),
            closes: self.counters.closes.load(Ordering::SeqCst),
            scrolls: self.counters.scrolls.load(Ordering::SeqCst),
            clicks: self.counters.clicks.load(Ordering::SeqCst),
        }
    }

    // URLs passed to open(), in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open(
        &self,
        url: &Url,
        _load_timeout: Duration,
    ) -> Result<Box<dyn RenderSession>, FetchError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.opened.lock().unwrap().push(url.to_string());

        let remaining = self.counters.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.counters.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(FetchError::Render("browser crashed".to_string()));
        }

        let key = url.to_string();
        if !self.pages.contains_key(&key) {
            return Err(FetchError::Render(format!("net::ERR_NAME_NOT_RESOLVED {}", key)));
        }

        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            current: key,
            height: 1000,
            scrolls_here: 0,
            counters: self.counters.clone(),
        }))
    }
}

struct FakeSession {
    pages: HashMap<String, FakePage>,
    current: String,
    height: i64,
    scrolls_here: u32,
    counters: Arc<Counters>,
}

impl FakeSession {
    fn page(&self) -> &FakePage {
        &self.pages[&self.current]
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn scroll_height(&mut self) -> Result<i64, FetchError> {
        Ok(self.height)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        if self.page().broken_scroll {
            return Err(FetchError::Render("element not interactable".to_string()));
        }
        self.counters.scrolls.fetch_add(1, Ordering::SeqCst);
        if self.scrolls_here < self.page().growth_steps {
            self.scrolls_here += 1;
            self.height += 1000;
        }
        Ok(())
    }

    async fn activate_next(&mut self, _wait: Duration) -> Result<bool, FetchError> {
        match self.page().next.clone() {
            Some(next) if self.pages.contains_key(&next) => {
                self.counters.clicks.fetch_add(1, Ordering::SeqCst);
                self.current = next;
                self.height = 1000;
                self.scrolls_here = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn html(&mut self) -> Result<String, FetchError> {
        Ok(self.page().html.clone())
    }

    async fn current_url(&mut self) -> Result<Option<Url>, FetchError> {
        Ok(Url::parse(&self.current).ok())
    }

    async fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeHttp {
    routes: HashMap<String, (StatusCode, Vec<u8>)>,
    // Requests that answer 503 this many times before the real response
    flaky: Mutex<HashMap<String, u32>>,
    hits: Mutex<HashMap<String, usize>>,
    user_agents: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes.insert(url.to_string(), (status, body.into()));
        self
    }

    pub fn flaky(self, url: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(url.to_string(), failures);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpGet for FakeHttp {
    async fn get(&self, url: &Url, headers: HeaderMap) -> Result<HttpResponse, FetchError> {
        let key = url.to_string();
        *self.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        if let Some(ua) = headers.get(reqwest::header::USER_AGENT) {
            self.user_agents
                .lock()
                .unwrap()
                .push(ua.to_str().unwrap_or_default().to_string());
        }

        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(left) = flaky.get_mut(&key) {
                if *left > 0 {
                    *left -= 1;
                    return Ok(response(StatusCode::SERVICE_UNAVAILABLE, Vec::new()));
                }
            }
        }

        match self.routes.get(&key) {
            Some((status, body)) => Ok(response(*status, body.clone())),
            None => Ok(response(StatusCode::NOT_FOUND, b"not found".to_vec())),
        }
    }
}

// Serves the body in small chunks so writers see a real stream
fn response(status: StatusCode, body: Vec<u8>) -> HttpResponse {
    let chunks: Vec<Result<Bytes, FetchError>> = body
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    HttpResponse {
        status,
        body: stream::iter(chunks).boxed(),
    }
}
