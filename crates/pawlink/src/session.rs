//! Session data model
//!
//! Offers, answers and candidates are opaque JSON produced by the peers'
//! WebRTC stacks. The relay never looks inside them.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Which side of the rendezvous a caller is acting as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeerRole {
    /// The camera: publishes the offer
    BaseStation,
    /// The viewer: publishes the answer
    RemoteViewer,
}

impl PeerRole {
    /// The opposite role
    pub fn peer(self) -> Self {
        match self {
            PeerRole::BaseStation => PeerRole::RemoteViewer,
            PeerRole::RemoteViewer => PeerRole::BaseStation,
        }
    }

    /// Wire name, as used in the `peerType` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            PeerRole::BaseStation => "base-station",
            PeerRole::RemoteViewer => "remote-viewer",
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a `peerType` string names no known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown peer type {0:?}")]
pub struct UnknownPeerRole(pub String);

impl FromStr for PeerRole {
    type Err = UnknownPeerRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base-station" => Ok(PeerRole::BaseStation),
            "remote-viewer" => Ok(PeerRole::RemoteViewer),
            other => Err(UnknownPeerRole(other.to_string())),
        }
    }
}

/// An SDP offer or answer (`{type, sdp}`), kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDescription(pub serde_json::Value);

/// A trickled ICE candidate (`{candidate, sdpMid, ...}`), kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IceCandidate(pub serde_json::Value);

/// Negotiation progress for one connection code.
///
/// A cleared or never-seen code reports `Empty`. An answer published
/// without an offer does not advance the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Empty,
    Offered,
    Answered,
}

impl SessionPhase {
    fn of(has_offer: bool, has_answer: bool) -> Self {
        match (has_offer, has_answer) {
            (false, _) => SessionPhase::Empty,
            (true, false) => SessionPhase::Offered,
            (true, true) => SessionPhase::Answered,
        }
    }
}

/// One rendezvous record
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) offer: Option<SessionDescription>,
    pub(crate) answer: Option<SessionDescription>,
    /// Published by the base station, drained by the viewer
    pub(crate) base_station_candidates: Vec<IceCandidate>,
    /// Published by the viewer, drained by the base station
    pub(crate) remote_viewer_candidates: Vec<IceCandidate>,
    /// Number of offers published under this code
    pub(crate) epoch: u64,
    pub(crate) last_activity: Instant,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            offer: None,
            answer: None,
            base_station_candidates: Vec::new(),
            remote_viewer_candidates: Vec::new(),
            epoch: 0,
            last_activity: Instant::now(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Start a fresh negotiation: new offer, nothing left from the last one
    pub(crate) fn reset_with_offer(&mut self, offer: SessionDescription) -> u64 {
        self.offer = Some(offer);
        self.answer = None;
        self.base_station_candidates.clear();
        self.remote_viewer_candidates.clear();
        self.epoch += 1;
        self.epoch
    }

    /// Queue holding candidates published by `role`
    pub(crate) fn queue_mut(&mut self, role: PeerRole) -> &mut Vec<IceCandidate> {
        match role {
            PeerRole::BaseStation => &mut self.base_station_candidates,
            PeerRole::RemoteViewer => &mut self.remote_viewer_candidates,
        }
    }

    /// Take every candidate meant for `role`, leaving that queue empty
    pub(crate) fn drain_for(&mut self, role: PeerRole) -> Vec<IceCandidate> {
        std::mem::take(self.queue_mut(role.peer()))
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        SessionPhase::of(self.offer.is_some(), self.answer.is_some())
    }

    pub(crate) fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            epoch: self.epoch,
            has_answer: self.answer.is_some(),
            pending_for_remote_viewer: self.base_station_candidates.len(),
            pending_for_base_station: self.remote_viewer_candidates.len(),
            idle: self.idle_for(),
        }
    }
}

/// Read-only view of a session, for status and phase checks
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub epoch: u64,
    pub has_answer: bool,
    pub pending_for_remote_viewer: usize,
    pub pending_for_base_station: usize,
    pub idle: Duration,
}
