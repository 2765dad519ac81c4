//! JSON-over-HTTP request/response plumbing.
//!
//! The [`Transport`] trait is the only seam between the runner and the network.
//! It hands back raw bytes and the status code; interpreting either is the
//! caller's job. Non-2xx responses are returned as values, never as errors.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::TransportError;

pub type TransportFut<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;

/// Status code and unparsed body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body as text for diagnostics, capped so a huge payload cannot flood logs.
    #[must_use]
    pub fn body_snippet(&self) -> String {
        crate::payload_snippet(&self.body)
    }
}

/// Outbound HTTP capability consumed by the runner and the aggregator.
///
/// Implementations must be shareable across concurrent runs.
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to the service base URL joined with `path`.
    fn post_json<'a>(&'a self, path: &'a str, body: &'a Value) -> TransportFut<'a>;

    /// GET an absolute URL (artifact downloads live on a different host).
    fn get<'a>(&'a self, url: &'a str) -> TransportFut<'a>;
}

/// [`Transport`] backed by a caller-built `reqwest::Client`.
///
/// The client is injected so one connection pool serves every run.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn execute(
        &self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<RawResponse, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        tracing::trace!(%url, status, body_bytes = body.len(), "HTTP exchange complete");
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(&'a self, path: &'a str, body: &'a Value) -> TransportFut<'a> {
        Box::pin(async move {
            let url = self.endpoint(path);
            let request = self.client.post(&url).json(body);
            self.execute(url, request).await
        })
    }

    fn get<'a>(&'a self, url: &'a str) -> TransportFut<'a> {
        Box::pin(async move {
            let request = self.client.get(url);
            self.execute(url.to_string(), request).await
        })
    }
}
