//! Lock-free relay counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Relay counters (returned as a snapshot from atomic counters)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub offers_published: u64,
    pub answers_published: u64,
    pub answers_rejected: u64,
    pub candidates_published: u64,
    pub candidates_delivered: u64,
    pub sessions_cleared: u64,
    pub sessions_reaped: u64,
}

pub(crate) struct AtomicRelayStats {
    pub(crate) offers_published: AtomicU64,
    pub(crate) answers_published: AtomicU64,
    pub(crate) answers_rejected: AtomicU64,
    pub(crate) candidates_published: AtomicU64,
    pub(crate) candidates_delivered: AtomicU64,
    pub(crate) sessions_cleared: AtomicU64,
    pub(crate) sessions_reaped: AtomicU64,
}

impl AtomicRelayStats {
    pub(crate) fn new() -> Self {
        Self {
            offers_published: AtomicU64::new(0),
            answers_published: AtomicU64::new(0),
            answers_rejected: AtomicU64::new(0),
            candidates_published: AtomicU64::new(0),
            candidates_delivered: AtomicU64::new(0),
            sessions_cleared: AtomicU64::new(0),
            sessions_reaped: AtomicU64::new(0),
        }
    }

    pub(crate) fn snapshot(&self) -> RelayStats {
        RelayStats {
            offers_published: self.offers_published.load(Ordering::Relaxed),
            answers_published: self.answers_published.load(Ordering::Relaxed),
            answers_rejected: self.answers_rejected.load(Ordering::Relaxed),
            candidates_published: self.candidates_published.load(Ordering::Relaxed),
            candidates_delivered: self.candidates_delivered.load(Ordering::Relaxed),
            sessions_cleared: self.sessions_cleared.load(Ordering::Relaxed),
            sessions_reaped: self.sessions_reaped.load(Ordering::Relaxed),
        }
    }
}
