//! Error types for cache storage.

/// Errors raised by a [`CacheStorage`](crate::CacheStorage) or one of its
/// stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem or other I/O failure in a persistent backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry metadata or a stored JSON body could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored request identity is not a valid URL.
    #[error("invalid request key: {0}")]
    InvalidKey(#[from] url::ParseError),

    /// Partial-content (206) responses are never cacheable.
    #[error("cannot cache partial response for {url}")]
    PartialContent { url: String },

    /// The store behind this handle was deleted from its storage.
    #[error("store '{name}' was deleted")]
    Detached { name: String },

    /// A store's on-disk state does not match what was written.
    #[error("store '{name}' is corrupt: {message}")]
    Corrupt { name: String, message: String },

    /// Generic error with message.
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    pub(crate) fn lock_poisoned() -> Self {
        Error::Other {
            message: "lock poisoned".into(),
        }
    }
}
