//! Probe outcome types

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal state of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success,
    Timeout,
    NetworkError,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::NetworkError => "network error",
        })
    }
}

/// Result of a single probe invocation. `reachable` is true only for [`ProbeOutcome::Success`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub reachable: bool,
    pub kind: ProbeOutcome,
    pub observed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ProbeResult {
    pub fn new(kind: ProbeOutcome, elapsed: Duration) -> Self {
        Self {
            reachable: kind == ProbeOutcome::Success,
            kind,
            observed_at: Utc::now(),
            elapsed_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    pub fn success(elapsed: Duration) -> Self {
        Self::new(ProbeOutcome::Success, elapsed)
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::new(ProbeOutcome::Timeout, elapsed)
    }

    pub fn network_error(elapsed: Duration) -> Self {
        Self::new(ProbeOutcome::NetworkError, elapsed)
    }
}
