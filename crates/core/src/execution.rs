//! Execution state as reported by the remote service, plus the
//! client-side session phase and transport health signal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-reported status of a submitted job.
///
/// Transitions are monotonic and driven by the server. The client never
/// infers a state; it only relays the latest one it observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl ExecutionState {
    /// `finished` and `failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a single polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Starting,
    Polling,
    Succeeded,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Health of the transport between client and service.
///
/// Independent of [`ExecutionState`]: a job can be `running` while the
/// client is `retrying` its status requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Connected,
    Retrying,
    Failed,
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Retrying => "retrying",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
