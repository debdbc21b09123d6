//! # shellcache-worker
//!
//! Keeps a web application shell available offline and in sync with a
//! versioned resource manifest across deployments.
//!
//! A [`ServiceWorker`] is one generation of the worker. The host delivers
//! [`WorkerEvent`]s to it:
//!
//! 1. `Install` downloads the shell files into a staging cache.
//! 2. `Activate` reconciles the committed cache against the manifest of the
//!    previous generation, keeps entries whose fingerprint did not change,
//!    and promotes staging.
//! 3. `Fetch` serves manifest resources, cache-first with lazy fill, except
//!    the root document which is online-first.
//! 4. `Message` handles `force-activate` and `download-offline`.
//!
//! Storage and network are injected as [`CacheStorage`] and [`Fetcher`], so
//! the same worker runs against the in-memory store in tests and the disk
//! store in the CLI.
//!
//! ```rust
//! use std::sync::Arc;
//! use shellcache_store::InMemoryCacheStorage;
//! use shellcache_net::ReqwestFetcher;
//! use shellcache_worker::{
//!     HostSignals, ResourceManifest, ServiceWorker, ShellSet, WorkerConfig,
//! };
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkerConfig::builder("https://app.example".parse()?)
//!     .manifest(ResourceManifest::from_pairs([("/", "h0"), ("main.js", "h1")]))
//!     .shell(ShellSet::new(["main.js"]))
//!     .build()?;
//!
//! let worker = ServiceWorker::new(
//!     config,
//!     Arc::new(InMemoryCacheStorage::new()),
//!     Arc::new(ReqwestFetcher::with_default_timeout()?),
//!     Arc::new(HostSignals::new()),
//! );
//! # let _ = worker;
//! # Ok(())
//! # }
//! ```
//!
//! [`CacheStorage`]: shellcache_store::CacheStorage
//! [`Fetcher`]: shellcache_net::Fetcher

pub mod cache_ops;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod key;
pub mod lifecycle;
pub mod maintenance;
pub mod manifest;
pub mod router;
pub mod worker;

pub use config::{BuildManifest, CacheNames, WorkerConfig, WorkerConfigBuilder};
pub use context::WorkerContext;
pub use error::{ActivationError, ActivationStep, AddAllError, ConfigError, WorkerError};
pub use host::{HostSignals, WorkerHost};
pub use key::{logical_key, manifest_record_key, resource_url, stored_path, ROOT_KEY};
pub use lifecycle::{ActivationOutcome, ActivationReport, Lifecycle};
pub use maintenance::{download_offline, ControlMessage, OfflineDownloadReport};
pub use manifest::{ResourceManifest, ShellSet};
pub use router::{FetchOutcome, Router};
pub use worker::{EventOutcome, MessageOutcome, ServiceWorker, WorkerEvent, WorkerState};
