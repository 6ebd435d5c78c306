//! Session record store
//!
//! Keyed storage of rendezvous sessions with the reset and drain rules the
//! relay depends on:
//! - In-process memory (`MemoryStore`)
//!
//! Absence is never an error here. A fallible backend (e.g. a shared
//! external store) reports its own failures through `anyhow::Result`.

pub mod memory;

use std::time::Duration;

use anyhow::Result;

use crate::{IceCandidate, PeerRole, SessionDescription, SessionSnapshot};

/// Outcome of publishing an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerWrite {
    /// No answer was present for this code
    Stored,
    /// An earlier answer in the same epoch was overwritten
    Replaced,
    /// An answer was already present and `replace` was false; nothing changed
    Rejected,
}

/// What `set_answer` did, observed under the same lock as the write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerReceipt {
    pub write: AnswerWrite,
    /// An offer was present when the answer arrived
    pub offered: bool,
}

/// Signaling store backend trait
///
/// Every operation on one code must be linearizable with every other
/// operation on the same code.
#[async_trait::async_trait]
pub trait SignalingBackend: Send + Sync {
    /// Store an offer, clearing the answer and both candidate queues.
    /// Returns the new offer epoch.
    async fn set_offer(&self, code: &str, offer: SessionDescription) -> Result<u64>;

    /// Latest offer for a code
    async fn get_offer(&self, code: &str) -> Result<Option<SessionDescription>>;

    /// Store an answer without touching the candidate queues
    async fn set_answer(
        &self,
        code: &str,
        answer: SessionDescription,
        replace: bool,
    ) -> Result<AnswerReceipt>;

    /// Latest answer for a code
    async fn get_answer(&self, code: &str) -> Result<Option<SessionDescription>>;

    /// Append a candidate to the queue owned by `role`
    async fn add_candidate(&self, code: &str, role: PeerRole, candidate: IceCandidate)
        -> Result<()>;

    /// Remove and return every candidate published by the peer of `role`.
    ///
    /// The clear covers exactly the returned items; a candidate added
    /// concurrently shows up in this batch or the next, never both.
    async fn drain_candidates_for(&self, code: &str, role: PeerRole) -> Result<Vec<IceCandidate>>;

    /// Delete a session. Returns whether it existed.
    async fn clear(&self, code: &str) -> Result<bool>;

    /// Inspect a session without creating it
    async fn snapshot(&self, code: &str) -> Result<Option<SessionSnapshot>>;

    /// Delete sessions untouched for at least `max_idle`. Returns how many.
    async fn reap_idle(&self, max_idle: Duration) -> Result<usize>;

    /// Number of live sessions
    async fn session_count(&self) -> Result<usize>;
}

pub use memory::MemoryStore;
