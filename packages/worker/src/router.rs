//! Routing of intercepted requests.

use std::sync::Arc;

use tracing::{debug, warn};

use shellcache_store::{CacheStore, Request, Response};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::key::{logical_key, ROOT_KEY};

/// What the worker does with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not ours; the host sends the request to the network unchanged.
    Passthrough,
    Respond(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond(response) => Some(response),
            FetchOutcome::Passthrough => None,
        }
    }
}

pub struct Router<'a> {
    ctx: &'a WorkerContext,
}

impl<'a> Router<'a> {
    pub fn new(ctx: &'a WorkerContext) -> Self {
        Self { ctx }
    }

    /// Classify `request` and serve it with the matching strategy.
    ///
    /// The root document is online-first; every other manifest resource is
    /// cache-first. Non-GET requests and paths outside the manifest pass
    /// through.
    pub async fn route(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        if !request.is_get() {
            return Ok(FetchOutcome::Passthrough);
        }

        let config = &self.ctx.config;
        let key = match logical_key(config.origin(), &request.url) {
            Some(key) if config.manifest().contains(&key) => key,
            _ => return Ok(FetchOutcome::Passthrough),
        };

        let response = if key == ROOT_KEY {
            self.online_first(request).await?
        } else {
            self.cache_first(request).await?
        };
        Ok(FetchOutcome::Respond(response))
    }

    /// Serve from the committed cache, fetching and storing on a miss.
    ///
    /// Only ok responses are stored. Network failures are returned as is.
    pub async fn cache_first(&self, request: &Request) -> Result<Response, WorkerError> {
        let identity = request.key();
        let cache = self.open_committed().await;

        if let Some(cache) = &cache {
            match cache.lookup(&identity).await {
                Ok(Some(response)) => {
                    debug!(key = %identity, "cache hit");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(e) => warn!(key = %identity, error = %e, "cache read failed"),
            }
        }

        let response = self.ctx.fetcher.fetch(request).await?;
        if response.ok() {
            if let Some(cache) = &cache {
                if let Err(e) = cache.put(identity.clone(), response.clone()).await {
                    warn!(key = %identity, error = %e, "failed to cache response");
                }
            }
        }
        Ok(response)
    }

    /// Fetch from the network, caching the result, and fall back to the
    /// committed cache when offline.
    pub async fn online_first(&self, request: &Request) -> Result<Response, WorkerError> {
        let identity = request.key();

        match self.ctx.fetcher.fetch(request).await {
            Ok(response) => {
                if let Some(cache) = self.open_committed().await {
                    if let Err(e) = cache.put(identity.clone(), response.clone()).await {
                        warn!(key = %identity, error = %e, "failed to cache response");
                    }
                }
                Ok(response)
            }
            Err(fetch_err) => {
                debug!(key = %identity, error = %fetch_err, "network failed, trying cache");
                if let Some(cache) = self.open_committed().await {
                    match cache.lookup(&identity).await {
                        Ok(Some(response)) => return Ok(response),
                        Ok(None) => {}
                        Err(e) => warn!(key = %identity, error = %e, "cache read failed"),
                    }
                }
                Err(fetch_err.into())
            }
        }
    }

    async fn open_committed(&self) -> Option<Arc<dyn CacheStore>> {
        match self.ctx.committed().await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "failed to open committed cache");
                None
            }
        }
    }
}
