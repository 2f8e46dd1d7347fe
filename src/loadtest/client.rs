//! Plain HTTP client for the catalog API.
//!
//! One [`reqwest::Client`] (and its connection pool) is shared by every
//! simulated user; cloning a [`CatalogClient`] is cheap.

use std::time::{Duration, Instant};

use crate::loadtest::catalog::RenderedRequest;
use crate::loadtest::error::{LoadTestError, RequestFailure};
use crate::loadtest::validate::ResponseRecord;

/// HTTP client bound to one target host.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Build a client with its own connection pool.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LoadTestError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("catalog-loadtest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadTestError::Cli {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_http(http, base_url, timeout))
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn with_http(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request and read the whole body.
    ///
    /// Any HTTP status is returned as a [`ResponseRecord`]; only transport
    /// errors (timeout, refused connection, broken body stream) become a
    /// [`RequestFailure`]. The timeout covers connect through body read.
    pub async fn send(&self, request: &RenderedRequest<'_>) -> Result<ResponseRecord, RequestFailure> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.as_reqwest(), &url)
            .timeout(self.timeout);
        if let Some(body) = request.json {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| RequestFailure::classify_reqwest(&e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestFailure::classify_reqwest(&e))?;

        Ok(ResponseRecord {
            status,
            body: body.to_vec(),
            elapsed: start.elapsed(),
        })
    }
}
