//! In-memory session store
//!
//! One `RwLock` over the whole map. Anything that creates, mutates or
//! refreshes a record takes the write lock, so operations on a code are
//! linearizable. This is a low-traffic rendezvous path; the coarse lock is
//! fine.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AnswerReceipt, AnswerWrite, SignalingBackend};
use crate::{IceCandidate, PeerRole, Session, SessionDescription, SessionSnapshot};

/// Process-local signaling store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the record for `code`, creating it if needed
    async fn with_session<T>(&self, code: &str, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(code.to_string()).or_insert_with(|| {
            debug!(code, "Session created");
            Session::new()
        });
        session.touch();
        f(session)
    }
}

#[async_trait::async_trait]
impl SignalingBackend for MemoryStore {
    async fn set_offer(&self, code: &str, offer: SessionDescription) -> Result<u64> {
        Ok(self
            .with_session(code, |s| s.reset_with_offer(offer))
            .await)
    }

    async fn get_offer(&self, code: &str) -> Result<Option<SessionDescription>> {
        Ok(self.with_session(code, |s| s.offer.clone()).await)
    }

    async fn set_answer(
        &self,
        code: &str,
        answer: SessionDescription,
        replace: bool,
    ) -> Result<AnswerReceipt> {
        Ok(self
            .with_session(code, |s| {
                let write = match (s.answer.is_some(), replace) {
                    (true, false) => AnswerWrite::Rejected,
                    (true, true) => {
                        s.answer = Some(answer);
                        AnswerWrite::Replaced
                    }
                    (false, _) => {
                        s.answer = Some(answer);
                        AnswerWrite::Stored
                    }
                };
                AnswerReceipt {
                    write,
                    offered: s.offer.is_some(),
                }
            })
            .await)
    }

    async fn get_answer(&self, code: &str) -> Result<Option<SessionDescription>> {
        Ok(self.with_session(code, |s| s.answer.clone()).await)
    }

    async fn add_candidate(
        &self,
        code: &str,
        role: PeerRole,
        candidate: IceCandidate,
    ) -> Result<()> {
        self.with_session(code, |s| s.queue_mut(role).push(candidate))
            .await;
        Ok(())
    }

    async fn drain_candidates_for(&self, code: &str, role: PeerRole) -> Result<Vec<IceCandidate>> {
        Ok(self.with_session(code, |s| s.drain_for(role)).await)
    }

    async fn clear(&self, code: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(code).is_some())
    }

    async fn snapshot(&self, code: &str) -> Result<Option<SessionSnapshot>> {
        Ok(self.sessions.read().await.get(code).map(Session::snapshot))
    }

    async fn reap_idle(&self, max_idle: Duration) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|code, session| {
            let keep = session.idle_for() < max_idle;
            if !keep {
                debug!(code = %code, epoch = session.epoch, "Reaping idle session");
            }
            keep
        });
        Ok(before - sessions.len())
    }

    async fn session_count(&self) -> Result<usize> {
        Ok(self.sessions.read().await.len())
    }
}
