//! Signals the worker sends to its host environment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

/// Host-side effects the worker can request.
pub trait WorkerHost: Send + Sync {
    /// Stop waiting for old pages to close and become eligible to activate.
    fn skip_waiting(&self);

    /// Take control of every open page immediately.
    fn claim_clients(&self);
}

impl<T: WorkerHost + ?Sized> WorkerHost for Arc<T> {
    fn skip_waiting(&self) {
        self.as_ref().skip_waiting()
    }

    fn claim_clients(&self) {
        self.as_ref().claim_clients()
    }
}

/// Records the signals it receives.
#[derive(Debug, Default)]
pub struct HostSignals {
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
}

impl HostSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst) > 0
    }

    pub fn clients_claimed(&self) -> bool {
        self.claims.load(Ordering::SeqCst) > 0
    }

    pub fn claim_count(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

impl WorkerHost for HostSignals {
    fn skip_waiting(&self) {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        info!("skip waiting requested");
    }

    fn claim_clients(&self) {
        self.claims.fetch_add(1, Ordering::SeqCst);
        info!("claiming all clients");
    }
}
