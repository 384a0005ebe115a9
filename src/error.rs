// src/error.rs
// =============================================================================
// Errors raised by the leaf components (render backend, HTTP, disk writes).
//
// Every variant here is "transient" from the pipeline's point of view: the
// retry policy retries all of them, and after the last attempt the error is
// recorded against the item that caused it. Things that are merely absent
// (no download button, no next page) are NOT errors and never show up here.
// =============================================================================

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, DNS failure, body read failure...
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered, but not with a 2xx
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    /// The browser backend failed (launch, navigation, script evaluation)
    #[error("render backend: {0}")]
    Render(String),

    /// A bounded wait ran out
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn render(err: impl std::fmt::Display) -> Self {
        FetchError::Render(err.to_string())
    }
}
