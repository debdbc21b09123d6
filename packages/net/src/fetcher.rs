//! Network fetch abstraction.
//!
//! This module provides the trait the worker fetches through, so tests can
//! script responses and simulate connectivity loss without a real network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use tracing::debug;

use shellcache_store::{CacheMode, Request, Response};

use crate::FetchError;

/// Trait for sending requests to the network.
///
/// Implementations can use real HTTP clients or scripted responses for tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send `request` and return the response.
    ///
    /// Returns `Err` only when no response was received at all.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.as_ref().fetch(request).await
    }
}

/// Production fetcher using reqwest.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Create a new fetcher with the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidRequest {
                message: format!("failed to build http client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, FetchError> {
        Self::new(Duration::from_secs(30))
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn request_headers(request: &Request) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::try_from(name.as_str()).map_err(|e| FetchError::InvalidRequest {
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::try_from(value.as_str()).map_err(|e| FetchError::InvalidRequest {
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        if request.cache_mode == CacheMode::Reload {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        Ok(headers)
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let method: http::Method = request.method.into();
        let headers = Self::request_headers(request)?;

        let response = self
            .client
            .request(method, request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::network(request.url.as_str(), e.to_string()))?;

        let status = response.status();
        let final_url = response.url().to_string();

        let mut resp_headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(request.url.as_str(), e.to_string()))?;

        debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "fetched"
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: resp_headers,
            url: Some(final_url),
            body,
        })
    }
}
