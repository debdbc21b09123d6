//! Install and activation of a worker generation.
//!
//! Install downloads the shell into the staging cache without touching the
//! committed cache that is still serving pages. Activation then reconciles
//! the committed cache against the previous manifest record:
//!
//! - with no record, committed is rebuilt from staging alone
//! - otherwise entries whose path left the manifest, or whose fingerprint
//!   changed, are evicted and the rest are kept
//!
//! Staging is promoted on top, the new manifest is persisted as the next
//! baseline, and the host is asked to claim all pages.
//!
//! Any failure during activation leaves the caches in an unknown state, so
//! [`Lifecycle::activate`] deletes all three and the next activation starts
//! from the no-record path.

use tracing::{debug, error, info};

use crate::cache_ops::{add_all, copy_entries};
use crate::context::WorkerContext;
use crate::error::{ActivationError, ActivationStep, AtStep, WorkerError};
use crate::key::{manifest_record_key, resource_url, stored_path};
use crate::manifest::ResourceManifest;

/// Summary of a successful activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// No manifest record existed; committed was rebuilt from staging.
    pub bootstrap: bool,
    pub evicted: usize,
    pub retained: usize,
    pub promoted: usize,
}

/// How an activation event ended. Activation itself never fails.
#[derive(Debug)]
pub enum ActivationOutcome {
    Committed(ActivationReport),
    /// Activation failed and every cache generation was deleted.
    Wiped(ActivationError),
}

impl ActivationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ActivationOutcome::Committed(_))
    }
}

pub struct Lifecycle<'a> {
    ctx: &'a WorkerContext,
}

impl<'a> Lifecycle<'a> {
    pub fn new(ctx: &'a WorkerContext) -> Self {
        Self { ctx }
    }

    /// Download every shell file into the staging cache.
    ///
    /// Returns the number of files staged. On failure staging may hold
    /// leftovers from an earlier attempt but nothing from this one.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        let config = &self.ctx.config;
        let urls = config
            .shell()
            .paths()
            .iter()
            .map(|path| resource_url(config.origin(), path))
            .collect::<Result<Vec<_>, _>>()?;

        info!(files = urls.len(), "installing shell");
        let staging = self.ctx.staging().await?;
        let staged = add_all(staging.as_ref(), self.ctx.fetcher.as_ref(), &urls)
            .await
            .map_err(WorkerError::Install)?;

        info!(staged, "shell installed");
        Ok(staged)
    }

    /// Run activation, wiping every cache generation if it fails.
    pub async fn activate(&self) -> ActivationOutcome {
        match self.activate_caches().await {
            Ok(report) => {
                info!(
                    bootstrap = report.bootstrap,
                    evicted = report.evicted,
                    retained = report.retained,
                    promoted = report.promoted,
                    "activation complete"
                );
                ActivationOutcome::Committed(report)
            }
            Err(err) => {
                error!(step = %err.step, error = %err, "failed to upgrade, wiping caches");
                self.wipe().await;
                ActivationOutcome::Wiped(err)
            }
        }
    }

    /// Reconcile committed against the previous manifest record and promote
    /// staging.
    pub async fn activate_caches(&self) -> Result<ActivationReport, ActivationError> {
        let ctx = self.ctx;
        let config = &ctx.config;
        let names = config.cache_names();
        let origin = config.origin();
        let manifest = config.manifest();

        let mut committed = ctx.committed().await.at(ActivationStep::OpenStores)?;
        let staging = ctx.staging().await.at(ActivationStep::OpenStores)?;
        let record_store = ctx.manifest_record().await.at(ActivationStep::OpenStores)?;

        let record_key = manifest_record_key(origin).at(ActivationStep::ReadRecord)?;
        let record = record_store
            .lookup(&record_key)
            .await
            .at(ActivationStep::ReadRecord)?;

        let mut report = ActivationReport::default();

        match record {
            None => {
                info!("no manifest record, rebuilding committed cache");
                report.bootstrap = true;
                ctx.storage
                    .delete(&names.committed)
                    .await
                    .at(ActivationStep::ResetCommitted)?;
                committed = ctx.committed().await.at(ActivationStep::ResetCommitted)?;
            }
            Some(record) => {
                let previous =
                    ResourceManifest::from_response(&record).at(ActivationStep::DecodeRecord)?;

                for key in committed.keys().await.at(ActivationStep::Reconcile)? {
                    let unchanged = stored_path(origin, &key).is_some_and(|path| {
                        manifest
                            .fingerprint(&path)
                            .is_some_and(|current| previous.fingerprint(&path) == Some(current))
                    });

                    if unchanged {
                        report.retained += 1;
                    } else {
                        debug!(key = %key, "evicting stale entry");
                        committed
                            .delete(&key)
                            .await
                            .at(ActivationStep::Reconcile)?;
                        report.evicted += 1;
                    }
                }
            }
        }

        report.promoted = copy_entries(staging.as_ref(), committed.as_ref())
            .await
            .at(ActivationStep::PromoteStaging)?;

        ctx.storage
            .delete(&names.staging)
            .await
            .at(ActivationStep::DiscardStaging)?;

        let record = manifest.to_response().at(ActivationStep::PersistRecord)?;
        record_store
            .put(record_key, record)
            .await
            .at(ActivationStep::PersistRecord)?;

        ctx.host.claim_clients();
        Ok(report)
    }

    /// Delete every cache generation, logging failures.
    pub async fn wipe(&self) {
        let names = self.ctx.config.cache_names();
        for name in [&names.committed, &names.staging, &names.manifest_record] {
            if let Err(e) = self.ctx.storage.delete(name).await {
                error!(cache = %name, error = %e, "failed to delete cache during wipe");
            }
        }
    }
}
