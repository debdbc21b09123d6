//! shellcache-store: Cache Storage Capability
//!
//! The worker never owns its persistent storage. It is handed a
//! [`CacheStorage`] by the host and opens named [`CacheStore`]s from it, one
//! per cache generation (committed, staging, manifest record).
//!
//! This crate defines:
//! - `Request` / `Response`: the values flowing through the network and caches
//! - `RequestKey`: the identity a cached response is stored under
//! - `CacheStore` / `CacheStorage`: the async capability traits
//! - `InMemoryCacheStorage`: a process-local implementation for tests and
//!   embedded hosts
//!
//! # Example
//!
//! ```rust
//! use shellcache_store::{CacheStorage, CacheStore, InMemoryCacheStorage, Request, Response};
//!
//! # async fn demo() -> Result<(), shellcache_store::Error> {
//! let storage = InMemoryCacheStorage::new();
//! let cache = storage.open("app-cache").await?;
//!
//! let request = Request::get("https://app.example/main.js".parse().unwrap());
//! cache.put(request.key(), Response::new(200, "console.log(1)")).await?;
//!
//! assert!(cache.lookup(&request.key()).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub use bytes::Bytes;
pub use url::Url;

mod error;
mod in_memory;
mod key;
mod traits;
mod types;

pub use error::Error;
pub use in_memory::{InMemoryCacheStorage, InMemoryCacheStore};
pub use key::RequestKey;
pub use traits::{ensure_cacheable, CacheStorage, CacheStore};
pub use types::{CacheMode, Method, Request, Response};
