use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use shellcache_store::{
    ensure_cacheable, Bytes, CacheStorage, CacheStore, Error, RequestKey, Response,
};

const STORE_INFO_FILE: &str = "store.json";
const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct StoreInfo {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    status_text: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

fn digest(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Write `data` to a temporary sibling of `path`, then rename it into place.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), Error> {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let tmp = path.with_file_name(format!(".{}.tmp-{}-{}", file_name, std::process::id(), n));

    fs::write(&tmp, data).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, Error> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file, returning whether it existed.
async fn remove_optional(path: &Path) -> Result<bool, Error> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// A [`CacheStorage`] rooted at a directory on the local filesystem.
///
/// # Example
///
/// ```rust,no_run
/// use shellcache_disk_store::DiskCacheStorage;
/// use shellcache_store::{CacheStorage, CacheStore};
///
/// # async fn demo() -> Result<(), shellcache_store::Error> {
/// let storage = DiskCacheStorage::new("/var/cache/shellcache")?;
/// let committed = storage.open("app-cache").await?;
/// println!("{} entries", committed.len().await?);
/// # Ok(())
/// # }
/// ```
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Use `root` as the storage directory, creating it if needed.
    ///
    /// Fails when `root` exists but is not a writable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let attr = std::fs::metadata(&root)?;
        if !attr.is_dir() {
            return Err(Error::Other {
                message: format!("cache root {} is not a directory", root.display()),
            });
        }
        if attr.permissions().readonly() {
            return Err(Error::Other {
                message: format!("cache root {} must be writable", root.display()),
            });
        }

        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name))
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheStore>, Error> {
        let dir = self.store_dir(name);
        let info_path = dir.join(STORE_INFO_FILE);

        if !fs::try_exists(&info_path).await? {
            fs::create_dir_all(&dir).await?;
            let info = serde_json::to_vec(&StoreInfo {
                name: name.to_string(),
            })?;
            write_atomic(&info_path, &info).await?;
            debug!(store = name, dir = %dir.display(), "created cache store");
        }

        Ok(Arc::new(DiskCacheStore {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let info_path = self.store_dir(name).join(STORE_INFO_FILE);
        Ok(fs::try_exists(&info_path).await?)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let dir = self.store_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(store = name, "deleted cache store");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        let mut dirs = fs::read_dir(&self.root).await?;
        while let Some(entry) = dirs.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(bytes) = read_optional(&entry.path().join(STORE_INFO_FILE)).await? {
                let info: StoreInfo = serde_json::from_slice(&bytes)?;
                names.push(info.name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for DiskCacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCacheStorage")
            .field("root", &self.root)
            .finish()
    }
}

/// One named store inside a [`DiskCacheStorage`].
pub struct DiskCacheStore {
    name: String,
    dir: PathBuf,
}

impl DiskCacheStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_paths(&self, key: &RequestKey) -> (PathBuf, PathBuf) {
        let stem = digest(key.as_str());
        (
            self.dir.join(format!("{}.{}", stem, META_EXT)),
            self.dir.join(format!("{}.{}", stem, BODY_EXT)),
        )
    }

    async fn ensure_attached(&self) -> Result<(), Error> {
        if fs::try_exists(self.dir.join(STORE_INFO_FILE)).await? {
            Ok(())
        } else {
            Err(Error::Detached {
                name: self.name.clone(),
            })
        }
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let (meta_path, body_path) = self.entry_paths(key);

        let Some(meta_bytes) = read_optional(&meta_path).await? else {
            return Ok(None);
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
        if meta.key != *key {
            return Err(Error::Corrupt {
                name: self.name.clone(),
                message: format!("{} holds {} instead of {}", meta_path.display(), meta.key, key),
            });
        }

        // A concurrent delete removes metadata first, then the body.
        let Some(body) = read_optional(&body_path).await? else {
            debug!(store = %self.name, %key, "entry vanished during read");
            return Ok(None);
        };

        debug!(store = %self.name, %key, bytes = body.len(), "read cache entry");
        Ok(Some(Response {
            status: meta.status,
            status_text: meta.status_text,
            headers: meta.headers,
            url: meta.url,
            body: Bytes::from(body),
        }))
    }

    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        ensure_cacheable(&key, &response)?;
        self.ensure_attached().await?;

        let (meta_path, body_path) = self.entry_paths(&key);
        write_atomic(&body_path, &response.body).await?;

        let meta = EntryMeta {
            key,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            url: response.url,
        };
        write_atomic(&meta_path, &serde_json::to_vec(&meta)?).await?;

        debug!(store = %self.name, key = %meta.key, bytes = response.body.len(), "wrote cache entry");
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let (meta_path, body_path) = self.entry_paths(key);
        let existed = remove_optional(&meta_path).await?;
        remove_optional(&body_path).await?;
        if existed {
            debug!(store = %self.name, %key, "deleted cache entry");
        }
        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_meta = path.extension().and_then(|e| e.to_str()) == Some(META_EXT);
            if !is_meta || entry.file_name() == STORE_INFO_FILE {
                continue;
            }
            if let Some(bytes) = read_optional(&path).await? {
                let meta: EntryMeta = serde_json::from_slice(&bytes)?;
                keys.push(meta.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for DiskCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCacheStore")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .finish()
    }
}
