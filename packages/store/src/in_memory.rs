//! Process-local cache storage.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::traits::ensure_cacheable;
use crate::{CacheStorage, CacheStore, Error, RequestKey, Response};

/// An in-memory [`CacheStorage`].
///
/// Stores live as long as the storage value. Useful for tests and for hosts
/// that persist nothing between runs.
///
/// # Example
///
/// ```rust
/// use shellcache_store::{CacheStorage, InMemoryCacheStorage};
///
/// # async fn demo() -> Result<(), shellcache_store::Error> {
/// let storage = InMemoryCacheStorage::new();
/// storage.open("staging").await?;
/// assert!(storage.has("staging").await?);
///
/// storage.delete("staging").await?;
/// assert!(!storage.has("staging").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct InMemoryCacheStorage {
    stores: RwLock<BTreeMap<String, Arc<InMemoryCacheStore>>>,
}

impl InMemoryCacheStorage {
    /// Create a new storage with no stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `name` as its concrete type, for callers that need inspection
    /// helpers beyond the trait.
    pub fn open_in_memory(&self, name: &str) -> Result<Arc<InMemoryCacheStore>, Error> {
        let mut stores = self.stores.write().map_err(|_| Error::lock_poisoned())?;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCacheStore::new(name)));
        Ok(Arc::clone(store))
    }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error> {
        let store: Arc<dyn CacheStore> = self.open_in_memory(name)?;
        Ok(store)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let stores = self.stores.read().map_err(|_| Error::lock_poisoned())?;
        Ok(stores.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().map_err(|_| Error::lock_poisoned())?;
        Ok(stores.remove(name).is_some())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().map_err(|_| Error::lock_poisoned())?;
        Ok(stores.keys().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryCacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.stores.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("InMemoryCacheStorage")
            .field("store_count", &count)
            .finish()
    }
}

/// One named in-memory cache.
pub struct InMemoryCacheStore {
    name: String,
    entries: RwLock<BTreeMap<RequestKey, Response>>,
}

impl InMemoryCacheStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Copy of every entry, ordered by key.
    pub fn snapshot(&self) -> Result<BTreeMap<RequestKey, Response>, Error> {
        let entries = self.entries.read().map_err(|_| Error::lock_poisoned())?;
        Ok(entries.clone())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let entries = self.entries.read().map_err(|_| Error::lock_poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        ensure_cacheable(&key, &response)?;
        let mut entries = self.entries.write().map_err(|_| Error::lock_poisoned())?;
        entries.insert(key, response);
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let mut entries = self.entries.write().map_err(|_| Error::lock_poisoned())?;
        Ok(entries.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let entries = self.entries.read().map_err(|_| Error::lock_poisoned())?;
        Ok(entries.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize, Error> {
        let entries = self.entries.read().map_err(|_| Error::lock_poisoned())?;
        Ok(entries.len())
    }
}
