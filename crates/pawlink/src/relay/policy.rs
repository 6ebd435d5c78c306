//! Relay configuration and the answer policy

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;

/// What to do when an answer arrives for a code that already has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerPolicy {
    /// Last writer wins
    #[default]
    Overwrite,
    /// Keep the first answer of the epoch and report a conflict
    Reject,
}

impl FromStr for AnswerPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(AnswerPolicy::Overwrite),
            "reject" => Ok(AnswerPolicy::Reject),
            other => anyhow::bail!("unknown answer policy {other:?} (expected overwrite or reject)"),
        }
    }
}

/// Relay behaviour knobs
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub answer_policy: AnswerPolicy,
    /// Sessions idle this long are deleted by the reaper (zero = never)
    pub session_idle_timeout: Duration,
    /// How often the reaper sweeps (zero disables the reaper)
    pub reap_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            answer_policy: AnswerPolicy::Overwrite,
            session_idle_timeout: Duration::from_secs(10 * 60),
            reap_interval: Duration::from_secs(60),
        }
    }
}
