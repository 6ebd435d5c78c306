//! The signaling relay service

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::{AnswerPolicy, RelayConfig};
use super::stats::{AtomicRelayStats, RelayStats};
use crate::store::{AnswerWrite, MemoryStore, SignalingBackend};
use crate::{IceCandidate, PeerRole, SessionDescription, SessionPhase, SessionSnapshot};

struct RelayInner {
    backend: Arc<dyn SignalingBackend>,
    config: RelayConfig,
    stats: AtomicRelayStats,
}

/// Signaling relay shared by all request handlers
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<RelayInner>,
}

impl SignalingRelay {
    /// Create a relay backed by a fresh in-memory store
    pub fn new(config: RelayConfig) -> Self {
        Self::with_backend(Arc::new(MemoryStore::new()), config)
    }

    /// Create a relay on top of any store backend
    pub fn with_backend(backend: Arc<dyn SignalingBackend>, config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                backend,
                config,
                stats: AtomicRelayStats::new(),
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Base station publishes an offer, starting a new epoch for `code`
    pub async fn publish_offer(&self, code: &str, offer: SessionDescription) -> Result<u64> {
        let epoch = self.inner.backend.set_offer(code, offer).await?;
        self.inner.stats.offers_published.fetch_add(1, Ordering::Relaxed);
        if epoch > 1 {
            info!(code, epoch, "Offer republished, previous negotiation discarded");
        } else {
            info!(code, "Offer published");
        }
        Ok(epoch)
    }

    pub async fn offer(&self, code: &str) -> Result<Option<SessionDescription>> {
        self.inner.backend.get_offer(code).await
    }

    /// Remote viewer publishes an answer.
    ///
    /// Under `AnswerPolicy::Reject` a second answer in the same epoch
    /// returns `AnswerWrite::Rejected` and leaves the first one in place.
    pub async fn publish_answer(&self, code: &str, answer: SessionDescription) -> Result<AnswerWrite> {
        let replace = self.inner.config.answer_policy == AnswerPolicy::Overwrite;
        let receipt = self.inner.backend.set_answer(code, answer, replace).await?;

        match receipt.write {
            AnswerWrite::Stored | AnswerWrite::Replaced => {
                self.inner.stats.answers_published.fetch_add(1, Ordering::Relaxed);
                if receipt.write == AnswerWrite::Replaced {
                    warn!(code, "Answer overwrote an earlier answer in the same epoch");
                }
                if receipt.offered {
                    info!(code, "Answer published");
                } else {
                    warn!(code, "Answer published before any offer");
                }
            }
            AnswerWrite::Rejected => {
                self.inner.stats.answers_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(code, "Answer rejected, session already answered");
            }
        }
        Ok(receipt.write)
    }

    pub async fn answer(&self, code: &str) -> Result<Option<SessionDescription>> {
        self.inner.backend.get_answer(code).await
    }

    /// Queue a candidate published by `role` for its peer
    pub async fn publish_candidate(
        &self,
        code: &str,
        role: PeerRole,
        candidate: IceCandidate,
    ) -> Result<()> {
        self.inner.backend.add_candidate(code, role, candidate).await?;
        self.inner.stats.candidates_published.fetch_add(1, Ordering::Relaxed);
        debug!(code, %role, "Candidate queued");
        Ok(())
    }

    /// Hand `role` every candidate its peer has published since the last drain
    pub async fn drain_candidates(&self, code: &str, role: PeerRole) -> Result<Vec<IceCandidate>> {
        let candidates = self.inner.backend.drain_candidates_for(code, role).await?;
        if !candidates.is_empty() {
            self.inner
                .stats
                .candidates_delivered
                .fetch_add(candidates.len() as u64, Ordering::Relaxed);
            debug!(code, %role, count = candidates.len(), "Candidates delivered");
        }
        Ok(candidates)
    }

    /// Forget everything about `code`. Safe to call repeatedly.
    pub async fn teardown(&self, code: &str) -> Result<bool> {
        let existed = self.inner.backend.clear(code).await?;
        if existed {
            self.inner.stats.sessions_cleared.fetch_add(1, Ordering::Relaxed);
        }
        info!(code, existed, "Cleared signaling data");
        Ok(existed)
    }

    pub async fn phase(&self, code: &str) -> Result<SessionPhase> {
        Ok(self
            .inner
            .backend
            .snapshot(code)
            .await?
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Empty))
    }

    pub async fn snapshot(&self, code: &str) -> Result<Option<SessionSnapshot>> {
        self.inner.backend.snapshot(code).await
    }

    pub fn stats(&self) -> RelayStats {
        self.inner.stats.snapshot()
    }

    /// Number of live sessions
    pub async fn sessions(&self) -> Result<usize> {
        self.inner.backend.session_count().await
    }

    /// Delete sessions idle longer than the configured timeout
    pub async fn reap_idle(&self) -> Result<usize> {
        let timeout = self.inner.config.session_idle_timeout;
        if timeout.is_zero() {
            return Ok(0);
        }
        let reaped = self.inner.backend.reap_idle(timeout).await?;
        self.inner
            .stats
            .sessions_reaped
            .fetch_add(reaped as u64, Ordering::Relaxed);
        Ok(reaped)
    }

    /// Sweep idle sessions every `reap_interval` until cancelled.
    ///
    /// A zero idle timeout or a zero sweep interval disables the reaper.
    pub async fn run_reaper(&self, cancel: CancellationToken) {
        let config = &self.inner.config;
        if config.session_idle_timeout.is_zero() || config.reap_interval.is_zero() {
            info!("Session reaper disabled");
            return;
        }

        let mut interval = tokio::time::interval(config.reap_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.reap_idle().await {
                        Ok(n) if n > 0 => info!("Reaped {} idle sessions", n),
                        Ok(_) => debug!("Reaper: nothing idle"),
                        Err(e) => warn!("Session reap failed: {}", e),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Session reaper shutting down");
                    break;
                }
            }
        }
    }
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
