//! Health State - Liveness and Readiness
//!
//! Readiness answers 200 only while the keeper accepts work and the RPC
//! endpoint responds to a block-number query. Shutdown flips `accepting`
//! off so probes report 503 while tasks drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ports::ledger::Ledger;

/// Shared health state polled by readiness probes.
pub struct HealthState {
    ledger: Arc<dyn Ledger>,
    accepting: AtomicBool,
}

impl HealthState {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            accepting: AtomicBool::new(true),
        }
    }

    /// Mark the process as draining.
    pub fn begin_shutdown(&self) {
        self.accepting.store(false, Ordering::Relaxed);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    /// Ready to serve traffic: not draining and the RPC answers.
    pub async fn is_ready(&self) -> bool {
        self.is_accepting() && self.ledger.is_healthy().await
    }
}
