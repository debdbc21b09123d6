use std::sync::Arc;

use shellcache_net::Fetcher;
use shellcache_store::{CacheStorage, CacheStore, Error as StoreError};

use crate::config::WorkerConfig;
use crate::host::WorkerHost;

/// The capabilities one worker generation runs against.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<WorkerConfig>,
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub host: Arc<dyn WorkerHost>,
}

impl WorkerContext {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            fetcher,
            host,
        }
    }

    pub async fn committed(&self) -> Result<Arc<dyn CacheStore>, StoreError> {
        self.storage
            .open(&self.config.cache_names().committed)
            .await
    }

    pub async fn staging(&self) -> Result<Arc<dyn CacheStore>, StoreError> {
        self.storage.open(&self.config.cache_names().staging).await
    }

    pub async fn manifest_record(&self) -> Result<Arc<dyn CacheStore>, StoreError> {
        self.storage
            .open(&self.config.cache_names().manifest_record)
            .await
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("origin", &self.config.origin().as_str())
            .field("cache_names", self.config.cache_names())
            .finish()
    }
}
