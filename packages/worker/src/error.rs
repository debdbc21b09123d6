//! Error types for the worker.

use std::fmt;

use shellcache_net::FetchError;
use shellcache_store::Error as StoreError;

use crate::WorkerState;

/// Invalid worker configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("shell path '{path}' is not in the resource manifest")]
    ShellPathNotInManifest { path: String },

    #[error("resource path '{path}' does not form a valid url: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cache name '{name}' is used for more than one cache")]
    DuplicateCacheName { name: String },

    #[error("invalid build manifest: {0}")]
    BuildManifest(#[from] serde_json::Error),
}

/// Failure of an all-or-nothing bulk fetch (`add_all`).
///
/// Nothing has been written to the target store when this is returned,
/// unless the failure is a [`AddAllError::Store`] during the final writes.
#[derive(Debug, thiserror::Error)]
pub enum AddAllError {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("{url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("failed to store fetched entries: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("install failed: {0}")]
    Install(#[source] AddAllError),

    #[error("offline download failed: {0}")]
    Download(#[source] AddAllError),

    #[error("cannot {event} while {actual}, worker must be {expected}")]
    InvalidState {
        event: &'static str,
        expected: WorkerState,
        actual: WorkerState,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid resource url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A step of cache activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStep {
    OpenStores,
    ReadRecord,
    DecodeRecord,
    ResetCommitted,
    Reconcile,
    PromoteStaging,
    DiscardStaging,
    PersistRecord,
}

impl fmt::Display for ActivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationStep::OpenStores => "open stores",
            ActivationStep::ReadRecord => "read manifest record",
            ActivationStep::DecodeRecord => "decode manifest record",
            ActivationStep::ResetCommitted => "reset committed cache",
            ActivationStep::Reconcile => "reconcile committed cache",
            ActivationStep::PromoteStaging => "promote staging cache",
            ActivationStep::DiscardStaging => "discard staging cache",
            ActivationStep::PersistRecord => "persist manifest record",
        };
        f.write_str(name)
    }
}

/// Activation failed part way; cache state can no longer be trusted.
#[derive(Debug, thiserror::Error)]
#[error("activation failed to {step}: {source}")]
pub struct ActivationError {
    pub step: ActivationStep,
    #[source]
    pub source: StoreError,
}

/// Tag a store result with the activation step it belongs to.
pub(crate) trait AtStep<T> {
    fn at(self, step: ActivationStep) -> Result<T, ActivationError>;
}

impl<T, E: Into<StoreError>> AtStep<T> for Result<T, E> {
    fn at(self, step: ActivationStep) -> Result<T, ActivationError> {
        self.map_err(|e| ActivationError {
            step,
            source: e.into(),
        })
    }
}
