//! Per-group session counters

use crate::socks::SessionEnd;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for one group's listener
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Connections accepted
    pub accepted: AtomicUsize,
    /// Sessions that reached the relay phase
    pub relayed: AtomicUsize,
    /// Sessions rejected during the client handshake
    pub rejected: AtomicUsize,
    /// Sessions whose backend handshake failed
    pub backend_failed: AtomicUsize,
    /// Sessions currently running
    pub active: AtomicUsize,
}

impl GroupStats {
    /// Create new group stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished session
    pub fn record_finished(&self, end: SessionEnd) {
        let counter = match end {
            SessionEnd::Relayed => &self.relayed,
            SessionEnd::Rejected => &self.rejected,
            SessionEnd::BackendFailed => &self.backend_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a session cut short by shutdown
    pub fn record_aborted(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            relayed: self.relayed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            backend_failed: self.backend_failed.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of group statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStatsSnapshot {
    /// Connections accepted
    pub accepted: usize,
    /// Sessions that reached the relay phase
    pub relayed: usize,
    /// Sessions rejected during the client handshake
    pub rejected: usize,
    /// Sessions whose backend handshake failed
    pub backend_failed: usize,
    /// Sessions currently running
    pub active: usize,
}
