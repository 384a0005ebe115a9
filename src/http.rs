// src/http.rs
// =============================================================================
// The HTTP capability the pipeline talks to.
//
// Detail pages and image bodies are both fetched through the HttpGet trait so
// that tests can serve fixtures from memory. ReqwestHttp is the real thing:
// one shared reqwest::Client (connection pooling).
//
// There is no deadline for a whole request: a large image on a slow link may
// take a while. Instead the same timeout bounds each wait: connecting,
// getting the response headers, and every gap between two body chunks.
//
// Non-2xx statuses are NOT turned into errors here; callers decide, since the
// status is part of the response they asked for.
// =============================================================================

use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

// Identifies us to the servers we talk to
pub const CLIENT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; gallery-harvest/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

pub type BodyStream = BoxStream<'static, Result<Bytes, FetchError>>;

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: BodyStream,
}

impl HttpResponse {
    // Turns a non-2xx status into a FetchError naming the URL
    pub fn error_for_status(self, url: &Url) -> Result<Self, FetchError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    // Drains the body into a String (lossy on invalid UTF-8)
    pub async fn text(mut self) -> Result<String, FetchError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get(&self, url: &Url, headers: HeaderMap) -> Result<HttpResponse, FetchError>;
}

// Default headers for every request we send
pub fn client_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers
}

#[derive(Clone)]
pub struct ReqwestHttp {
    client: Client,
    idle_timeout: Duration,
}

impl ReqwestHttp {
    pub fn new(idle_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(idle_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            idle_timeout,
        })
    }
}

// Ends `body` with a Timeout error if no chunk arrives for `idle`
fn idle_bounded(body: BodyStream, idle: Duration) -> BodyStream {
    stream::unfold(Some(body), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(body))),
            Ok(None) => None,
            Err(_) => Some((Err(FetchError::Timeout(idle, "response body")), None)),
        }
    })
    .boxed()
}

#[async_trait]
impl HttpGet for ReqwestHttp {
    async fn get(&self, url: &Url, headers: HeaderMap) -> Result<HttpResponse, FetchError> {
        let request = self.client.get(url.clone()).headers(headers).send();
        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.idle_timeout, "response headers"))??;

        let status = response.status();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from))
            .boxed();

        Ok(HttpResponse {
            status,
            body: idle_bounded(body, self.idle_timeout),
        })
    }
}
