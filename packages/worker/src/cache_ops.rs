//! Multi-entry operations on cache stores.

use tracing::debug;
use url::Url;

use shellcache_net::Fetcher;
use shellcache_store::{CacheStore, Error as StoreError, Request};

use crate::error::AddAllError;

/// Fetch every URL bypassing intermediate caches and store the responses.
///
/// All or nothing: the first network failure or non-ok status aborts the
/// call before anything is written. Returns the number of entries stored.
pub async fn add_all(
    cache: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    urls: &[Url],
) -> Result<usize, AddAllError> {
    let mut fetched = Vec::with_capacity(urls.len());

    for url in urls {
        let request = Request::reload(url.clone());
        let response = fetcher
            .fetch(&request)
            .await
            .map_err(|source| AddAllError::Network {
                url: url.to_string(),
                source,
            })?;

        if !response.ok() {
            return Err(AddAllError::BadStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        fetched.push((request.key(), response));
    }

    let count = fetched.len();
    for (key, response) in fetched {
        debug!(cache = cache.name(), key = %key, "storing");
        cache.put(key, response).await?;
    }

    Ok(count)
}

/// Copy every entry of `from` into `to`, overwriting same-keyed entries.
pub async fn copy_entries(from: &dyn CacheStore, to: &dyn CacheStore) -> Result<usize, StoreError> {
    let mut copied = 0;
    for key in from.keys().await? {
        // Entries deleted between keys() and lookup() are skipped.
        if let Some(response) = from.lookup(&key).await? {
            to.put(key, response).await?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_net::MockFetcher;
    use shellcache_store::{CacheMode, InMemoryCacheStore, RequestKey, Response};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn add_all_stores_every_response_with_reload() {
        let fetcher = MockFetcher::new()
            .with_body("https://app.example/a.js", "a")
            .with_body("https://app.example/b.js", "b");
        let cache = InMemoryCacheStore::new("c");

        let urls = [url("https://app.example/a.js"), url("https://app.example/b.js")];
        let stored = add_all(&cache, &fetcher, &urls).await.unwrap();

        assert_eq!(stored, 2);
        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(fetcher
            .recorded_requests()
            .iter()
            .all(|r| r.cache_mode == CacheMode::Reload));
    }

    #[tokio::test]
    async fn add_all_stores_nothing_on_bad_status() {
        let fetcher = MockFetcher::new().with_body("https://app.example/a.js", "a");
        let cache = InMemoryCacheStore::new("c");

        let urls = [url("https://app.example/a.js"), url("https://app.example/missing.js")];
        let err = add_all(&cache, &fetcher, &urls).await.unwrap_err();

        assert!(matches!(err, AddAllError::BadStatus { status: 404, .. }));
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn add_all_stores_nothing_on_network_failure() {
        let fetcher = MockFetcher::new()
            .with_body("https://app.example/a.js", "a")
            .failing("https://app.example/b.js");
        let cache = InMemoryCacheStore::new("c");

        let urls = [url("https://app.example/a.js"), url("https://app.example/b.js")];
        let err = add_all(&cache, &fetcher, &urls).await.unwrap_err();

        assert!(matches!(err, AddAllError::Network { .. }));
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn copy_entries_overwrites() {
        let from = InMemoryCacheStore::new("from");
        let to = InMemoryCacheStore::new("to");
        let a = RequestKey::parse("https://app.example/a.js").unwrap();
        let b = RequestKey::parse("https://app.example/b.js").unwrap();

        from.put(a.clone(), Response::new(200, "new")).await.unwrap();
        to.put(a.clone(), Response::new(200, "old")).await.unwrap();
        to.put(b.clone(), Response::new(200, "b")).await.unwrap();

        assert_eq!(copy_entries(&from, &to).await.unwrap(), 1);
        assert_eq!(to.lookup(&a).await.unwrap().unwrap().body.as_ref(), b"new");
        assert!(to.lookup(&b).await.unwrap().is_some());
    }
}
