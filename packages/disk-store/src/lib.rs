//! Persistent cache storage on the local filesystem.
//!
//! The committed cache and the manifest record outlive a worker generation,
//! so hosts that run the worker outside a browser need storage that survives
//! a restart. [`DiskCacheStorage`] keeps one directory per named store:
//!
//! ```text
//! <root>/
//!   <sha256(store name)>/
//!     store.json              {"name": "app-cache"}
//!     <sha256(key)>.json      entry metadata (key, status, headers, url)
//!     <sha256(key)>.body      raw response body
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place. The
//! metadata file is written last, so an entry only becomes visible once its
//! body is complete.

mod disk;

pub use disk::{DiskCacheStorage, DiskCacheStore};
