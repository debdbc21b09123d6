//! Scripted fetcher for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use shellcache_store::{Request, RequestKey, Response};

use crate::{FetchError, Fetcher};

/// A mock fetcher that returns predefined responses.
///
/// Clones share state, so a test can keep one handle to flip the network
/// off while the worker holds another.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    default_response: Arc<Mutex<Option<Response>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    offline: Arc<AtomicBool>,
    recorded_requests: Arc<Mutex<Vec<Request>>>,
}

fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => RequestKey::from_url(&parsed).to_string(),
        Err(_) => url.to_string(),
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `url` with `response`.
    pub fn with_response(self, url: &str, response: Response) -> Self {
        self.set_response(url, response);
        self
    }

    /// Respond to `url` with a 200 carrying `body`.
    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.with_response(url, Response::new(200, body.to_string()))
    }

    /// Response for URLs with no specific entry. Without one they get a 404.
    pub fn with_default_response(self, response: Response) -> Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Make requests for `url` fail as if the network dropped.
    pub fn failing(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(normalize(url));
        self
    }

    pub fn set_response(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(normalize(url), response);
    }

    pub fn remove_response(&self, url: &str) {
        self.responses.lock().unwrap().remove(&normalize(url));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<Request> {
        self.recorded_requests.lock().unwrap().clone()
    }

    /// Number of recorded requests whose URL (fragment ignored) is `url`.
    pub fn request_count(&self, url: &str) -> usize {
        let wanted = normalize(url);
        self.recorded_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.key().as_str() == wanted)
            .count()
    }

    pub fn clear_recorded(&self) {
        self.recorded_requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.recorded_requests.lock().unwrap().push(request.clone());

        let key = request.key().to_string();
        if self.is_offline() || self.failing.lock().unwrap().contains(&key) {
            return Err(FetchError::network(key, "network unreachable"));
        }

        if let Some(response) = self.responses.lock().unwrap().get(&key) {
            return Ok(response.clone().with_url(key.clone()));
        }

        if let Some(ref response) = *self.default_response.lock().unwrap() {
            return Ok(response.clone().with_url(key));
        }

        Ok(Response::new(404, "Not Found").with_url(key))
    }
}
