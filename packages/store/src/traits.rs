//! Capability traits: CacheStore, CacheStorage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, RequestKey, Response};

/// A single named cache: request identities mapped to stored responses.
///
/// All methods take `&self`. Fetch handling, activation and maintenance work
/// can hold handles to the same store at once, so implementations use
/// interior mutability and keep each operation individually atomic.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn CacheStore>`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The name this store was opened under.
    fn name(&self) -> &str;

    /// Look up the response stored for `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing is stored under the key.
    /// * `Ok(Some(response))` - The stored response.
    /// * `Err(Error)` - The backend failed.
    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Store `response` under `key`, replacing any existing entry.
    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error>;

    /// Remove the entry for `key`. Returns whether an entry existed.
    async fn delete(&self, key: &RequestKey) -> Result<bool, Error>;

    /// Every identity currently stored.
    async fn keys(&self) -> Result<Vec<RequestKey>, Error>;

    async fn len(&self) -> Result<usize, Error> {
        Ok(self.keys().await?.len())
    }

    async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

/// The host's collection of named caches.
///
/// Deleting a name detaches the store and the next `open` yields a fresh
/// empty one. What a handle opened earlier sees depends on the backend. The
/// in-memory backend keeps serving it from the orphaned map. The disk backend
/// fails its writes with [`Error::Detached`] until the name is reopened, after
/// which the old handle addresses the new store.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the store called `name`, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Delete the store called `name`. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn names(&self) -> Result<Vec<String>, Error>;
}

/// Reject responses no cache may hold.
pub fn ensure_cacheable(key: &RequestKey, response: &Response) -> Result<(), Error> {
    if response.status == 206 {
        return Err(Error::PartialContent {
            url: key.to_string(),
        });
    }
    Ok(())
}

// Blanket implementations for shared handles

#[async_trait]
impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        self.as_ref().lookup(key).await
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        self.as_ref().put(key, response).await
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.as_ref().delete(key).await
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.as_ref().keys().await
    }
}

#[async_trait]
impl<T: CacheStorage + ?Sized> CacheStorage for Arc<T> {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error> {
        self.as_ref().open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.as_ref().has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.as_ref().delete(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.as_ref().names().await
    }
}
