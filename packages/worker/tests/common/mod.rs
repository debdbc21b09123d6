#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use shellcache_net::MockFetcher;
use shellcache_store::{
    CacheStorage, CacheStore, Error, InMemoryCacheStorage, RequestKey, Response, Url,
};
use shellcache_worker::{
    logical_key, manifest_record_key, resource_url, HostSignals, ResourceManifest, ServiceWorker,
    ShellSet, WorkerConfig, WorkerContext,
};

pub const ORIGIN: &str = "https://app.example";
pub const COMMITTED: &str = "app-cache";
pub const STAGING: &str = "app-temp-cache";
pub const RECORD: &str = "app-manifest";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Url {
    resource_url(&origin(), path).unwrap()
}

pub fn key(path: &str) -> RequestKey {
    RequestKey::from_url(&url(path))
}

pub fn manifest(entries: &[(&str, &str)]) -> ResourceManifest {
    ResourceManifest::from_pairs(entries.iter().copied())
}

pub fn config(entries: &[(&str, &str)], shell: &[&str]) -> WorkerConfig {
    WorkerConfig::builder(origin())
        .manifest(manifest(entries))
        .shell(ShellSet::new(shell.iter().copied()))
        .build()
        .unwrap()
}

/// In-memory storage, a scripted network and recorded host signals.
pub struct Harness {
    pub storage: Arc<InMemoryCacheStorage>,
    pub fetcher: MockFetcher,
    pub host: Arc<HostSignals>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(InMemoryCacheStorage::new()),
            fetcher: MockFetcher::new(),
            host: Arc::new(HostSignals::new()),
        }
    }

    pub fn serve(&self, path: &str, body: &str) {
        self.fetcher
            .set_response(url(path).as_str(), Response::new(200, body.to_string()));
    }

    pub fn worker(&self, config: WorkerConfig) -> ServiceWorker {
        ServiceWorker::new(
            config,
            self.storage.clone(),
            Arc::new(self.fetcher.clone()),
            self.host.clone(),
        )
    }

    pub fn resumed(&self, config: WorkerConfig) -> ServiceWorker {
        ServiceWorker::resume(
            config,
            self.storage.clone(),
            Arc::new(self.fetcher.clone()),
            self.host.clone(),
        )
    }

    pub fn context(&self, config: WorkerConfig) -> WorkerContext {
        WorkerContext::new(
            config,
            self.storage.clone(),
            Arc::new(self.fetcher.clone()),
            self.host.clone(),
        )
    }

    /// Put `(path, body)` entries into the named store.
    pub async fn seed(&self, store: &str, entries: &[(&str, &str)]) {
        let cache = self.storage.open(store).await.unwrap();
        for (path, body) in entries {
            cache
                .put(key(path), Response::new(200, body.to_string()))
                .await
                .unwrap();
        }
    }

    /// Contents of the named store as logical path to body text.
    pub async fn bodies(&self, store: &str) -> BTreeMap<String, String> {
        let cache = self.storage.open_in_memory(store).unwrap();
        cache
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|(k, r)| {
                (
                    logical_key(&origin(), k.url()).unwrap(),
                    String::from_utf8_lossy(&r.body).into_owned(),
                )
            })
            .collect()
    }

    pub async fn persist_record(&self, record: &ResourceManifest) {
        let store = self.storage.open(RECORD).await.unwrap();
        store
            .put(
                manifest_record_key(&origin()).unwrap(),
                record.to_response().unwrap(),
            )
            .await
            .unwrap();
    }

    pub async fn record(&self) -> Option<ResourceManifest> {
        let store = self.storage.open(RECORD).await.unwrap();
        store
            .lookup(&manifest_record_key(&origin()).unwrap())
            .await
            .unwrap()
            .map(|r| ResourceManifest::from_response(&r).unwrap())
    }

    pub async fn has(&self, store: &str) -> bool {
        self.storage.has(store).await.unwrap()
    }
}

pub fn expected(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(p, b)| (p.to_string(), b.to_string()))
        .collect()
}

/// Storage whose named store rejects every write.
pub struct ReadOnlyStoreStorage {
    pub inner: Arc<InMemoryCacheStorage>,
    pub read_only: String,
}

struct ReadOnlyStore(Arc<dyn CacheStore>);

#[async_trait]
impl CacheStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        self.0.lookup(key).await
    }

    async fn put(&self, _key: RequestKey, _response: Response) -> Result<(), Error> {
        Err(Error::Other {
            message: "store is read-only".to_string(),
        })
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.0.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.0.keys().await
    }
}

#[async_trait]
impl CacheStorage for ReadOnlyStoreStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error> {
        let store = self.inner.open(name).await?;
        if name == self.read_only {
            Ok(Arc::new(ReadOnlyStore(store)))
        } else {
            Ok(store)
        }
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.inner.names().await
    }
}
