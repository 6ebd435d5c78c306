//! Pawlink - signaling relay for P2P pet camera sessions
//!
//! A base station (the camera) and a remote viewer meet under a shared
//! connection code and swap an offer, an answer and trickled ICE candidates
//! through this relay. Media never passes through here.
//!
//! - **Core types** (always available): PeerRole, SessionDescription, IceCandidate, SessionPhase
//! - **`store`**: the `SignalingBackend` trait and the in-memory `MemoryStore`
//! - **`relay`**: role semantics, answer policy, stats and the idle-session reaper
//! - **`web`**: axum HTTP interface (feature `web`, on by default)
//!
//! Session records never leave the store; callers inspect them through
//! `SessionSnapshot`:
//!
//! ```compile_fail
//! let _record = pawlink::Session::new();
//! ```

mod session;

pub use session::{
    IceCandidate, PeerRole, SessionDescription, SessionPhase, SessionSnapshot, UnknownPeerRole,
};
pub(crate) use session::Session;

// Store: session records keyed by connection code
pub mod store;

// Relay: rendezvous protocol on top of a store
pub mod relay;

// Web: axum routes for offer/answer/ice-candidate
#[cfg(feature = "web")]
pub mod web;
