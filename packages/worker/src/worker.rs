//! The worker state machine and event dispatch.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use shellcache_net::Fetcher;
use shellcache_store::{CacheStorage, Request};

use crate::config::WorkerConfig;
use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::host::WorkerHost;
use crate::lifecycle::{ActivationOutcome, Lifecycle};
use crate::maintenance::{download_offline, ControlMessage, OfflineDownloadReport};
use crate::router::{FetchOutcome, Router};

/// Lifecycle state of one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this generation will never activate.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(ControlMessage),
}

#[derive(Debug)]
pub enum EventOutcome {
    Installed { staged: usize },
    Activated(ActivationOutcome),
    Fetch(FetchOutcome),
    Message(MessageOutcome),
}

#[derive(Debug)]
pub enum MessageOutcome {
    /// Skip-waiting was forwarded to the host; activation stays event driven.
    SkipWaitingRequested,
    Activated(ActivationOutcome),
    Downloaded(OfflineDownloadReport),
    Ignored,
}

/// One worker generation.
///
/// Events may be dispatched concurrently from several tasks. Install and
/// activation are guarded by the state machine, fetches only touch the
/// committed cache.
pub struct ServiceWorker {
    ctx: WorkerContext,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        Self::with_state(config, storage, fetcher, host, WorkerState::Parsed)
    }

    /// A worker whose generation already activated in an earlier process.
    pub fn resume(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        Self::with_state(config, storage, fetcher, host, WorkerState::Activated)
    }

    fn with_state(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn WorkerHost>,
        state: WorkerState,
    ) -> Self {
        Self {
            ctx: WorkerContext::new(config, storage, fetcher, host),
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Move from `expected` to `next`, or fail if another state is current.
    fn transition(
        &self,
        event: &'static str,
        expected: WorkerState,
        next: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != expected {
            return Err(WorkerError::InvalidState {
                event,
                expected,
                actual: *state,
            });
        }
        *state = next;
        Ok(())
    }

    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, WorkerError> {
        match event {
            WorkerEvent::Install => {
                let staged = self.install().await?;
                Ok(EventOutcome::Installed { staged })
            }
            WorkerEvent::Activate => Ok(EventOutcome::Activated(self.activate().await?)),
            WorkerEvent::Fetch(request) => {
                Ok(EventOutcome::Fetch(self.handle_fetch(&request).await?))
            }
            WorkerEvent::Message(message) => {
                Ok(EventOutcome::Message(self.handle_message(message).await?))
            }
        }
    }

    /// Stage the shell. A failed install makes this generation redundant.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        self.transition("install", WorkerState::Parsed, WorkerState::Installing)?;
        self.ctx.host.skip_waiting();

        match Lifecycle::new(&self.ctx).install().await {
            Ok(staged) => {
                self.set_state(WorkerState::Installed);
                Ok(staged)
            }
            Err(e) => {
                warn!(error = %e, "install failed, worker is redundant");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Activate the installed generation. Always ends `Activated`, even when
    /// the caches had to be wiped.
    pub async fn activate(&self) -> Result<ActivationOutcome, WorkerError> {
        self.transition("activate", WorkerState::Installed, WorkerState::Activating)?;
        let outcome = Lifecycle::new(&self.ctx).activate().await;
        self.set_state(WorkerState::Activated);
        Ok(outcome)
    }

    /// Intercept a request. Nothing is intercepted before activation.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        if self.state() != WorkerState::Activated {
            return Ok(FetchOutcome::Passthrough);
        }
        Router::new(&self.ctx).route(request).await
    }

    pub async fn handle_message(
        &self,
        message: ControlMessage,
    ) -> Result<MessageOutcome, WorkerError> {
        match message {
            ControlMessage::ForceActivate => {
                self.ctx.host.skip_waiting();
                if self.state() == WorkerState::Installed {
                    info!("forcing activation");
                    Ok(MessageOutcome::Activated(self.activate().await?))
                } else {
                    Ok(MessageOutcome::SkipWaitingRequested)
                }
            }
            ControlMessage::DownloadOffline => {
                let report = download_offline(&self.ctx).await?;
                info!(
                    requested = report.requested,
                    downloaded = report.downloaded,
                    "offline download complete"
                );
                Ok(MessageOutcome::Downloaded(report))
            }
            ControlMessage::Unknown(other) => {
                warn!(message = %other, "ignoring unknown control message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}

impl fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("state", &self.state())
            .field("ctx", &self.ctx)
            .finish()
    }
}
