//! Control messages from the host page.

use std::collections::HashSet;
use std::fmt;

use tracing::info;

use crate::cache_ops::add_all;
use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::key::{resource_url, stored_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting worker now.
    ForceActivate,
    /// Cache every manifest resource not yet in the committed cache.
    DownloadOffline,
    /// Anything else. Logged and ignored.
    Unknown(String),
}

impl ControlMessage {
    pub fn parse(message: &str) -> Self {
        match message {
            "force-activate" | "skipWaiting" => ControlMessage::ForceActivate,
            "download-offline" | "downloadOffline" => ControlMessage::DownloadOffline,
            other => ControlMessage::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::ForceActivate => f.write_str("force-activate"),
            ControlMessage::DownloadOffline => f.write_str("download-offline"),
            ControlMessage::Unknown(other) => write!(f, "unknown message '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineDownloadReport {
    /// Manifest paths that were missing from the committed cache.
    pub requested: usize,
    pub downloaded: usize,
}

/// Fetch every manifest resource missing from the committed cache.
///
/// A resource counts as present only when it is cached under its plain URL,
/// the identity a request for it looks up.
///
/// One failed fetch fails the whole download and nothing is stored.
pub async fn download_offline(ctx: &WorkerContext) -> Result<OfflineDownloadReport, WorkerError> {
    let config = &ctx.config;
    let origin = config.origin();
    let committed = ctx.committed().await?;

    let present: HashSet<String> = committed
        .keys()
        .await?
        .iter()
        .filter_map(|key| stored_path(origin, key))
        .collect();

    let urls = config
        .manifest()
        .paths()
        .filter(|path| !present.contains(*path))
        .map(|path| resource_url(origin, path))
        .collect::<Result<Vec<_>, _>>()?;

    info!(missing = urls.len(), "downloading offline resources");
    let downloaded = add_all(committed.as_ref(), ctx.fetcher.as_ref(), &urls)
        .await
        .map_err(WorkerError::Download)?;

    Ok(OfflineDownloadReport {
        requested: urls.len(),
        downloaded,
    })
}
