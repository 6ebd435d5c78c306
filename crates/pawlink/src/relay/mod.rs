//! Rendezvous protocol layered on a signaling store
//!
//! The relay is the authoritative core that:
//! - Applies role semantics (each role drains the other role's candidates)
//! - Tracks negotiation phase per code: Empty -> Offered -> Answered
//! - Enforces the answer policy within an offer epoch
//! - Reaps sessions nobody has touched for a while

mod policy;
mod service;
mod stats;

pub use policy::{AnswerPolicy, RelayConfig};
pub use service::SignalingRelay;
pub use stats::RelayStats;

// Re-export store types callers need alongside the relay
pub use crate::store::{AnswerReceipt, AnswerWrite, MemoryStore, SignalingBackend};
