// src/render/mod.rs
// =============================================================================
// Everything that needs a real browser.
//
// Gallery listings lazy-load their previews while you scroll, so a plain GET
// only sees a skeleton. This module defines the render capability as two
// traits (Renderer opens a session, RenderSession drives one page) and the
// Fetcher that scrolls a page until it settles.
//
// Submodules:
// - chrome: Renderer backed by headless Chrome (chromiumoxide)
// - fetcher: the scroll / settle / next-page algorithm, with retries
// =============================================================================

mod chrome;
mod fetcher;

pub use chrome::ChromeRenderer;
pub use fetcher::{Fetcher, RenderedPage};

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

// Opens one rendering session per call. Sessions are never shared.
#[async_trait]
pub trait Renderer: Send + Sync {
    // Loads `url` and waits (at most `load_timeout`) for the document body
    async fn open(&self, url: &Url, load_timeout: Duration)
        -> Result<Box<dyn RenderSession>, FetchError>;
}

// One loaded page. Callers must call close() on every exit path.
#[async_trait]
pub trait RenderSession: Send {
    // Current scrollable height of the document
    async fn scroll_height(&mut self) -> Result<i64, FetchError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;

    // Looks for a "next page" control for at most `wait` and clicks it.
    // Ok(false) means no such control: that is not an error.
    async fn activate_next(&mut self, wait: Duration) -> Result<bool, FetchError>;

    async fn html(&mut self) -> Result<String, FetchError>;

    // Where the page is now; clicking "next" may have moved it.
    // None if the backend can't tell.
    async fn current_url(&mut self) -> Result<Option<Url>, FetchError>;

    async fn close(&mut self);
}
