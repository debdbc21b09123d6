//! # shellcache-net
//!
//! The network capability the worker fetches through.
//!
//! The worker only sees the [`Fetcher`] trait, so hosts decide how requests
//! actually leave the process:
//!
//! - [`ReqwestFetcher`]: a real HTTP client
//! - `MockFetcher` (feature `test-utils`): scripted responses, an offline
//!   switch, and a request log for tests
//!
//! ```ignore
//! use shellcache_net::{Fetcher, ReqwestFetcher};
//! use shellcache_store::Request;
//!
//! let fetcher = ReqwestFetcher::with_default_timeout()?;
//! let response = fetcher
//!     .fetch(&Request::reload("https://app.example/main.js".parse()?))
//!     .await?;
//! ```
//!
//! A resolved HTTP exchange is always `Ok`, whatever its status. Only
//! transport failures (DNS, refused connection, timeout) are `Err`, which is
//! what the worker treats as "offline".

pub mod error;
pub mod fetcher;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::FetchError;
pub use fetcher::{Fetcher, ReqwestFetcher};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockFetcher;
