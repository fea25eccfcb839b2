//! Progress events emitted by polling sessions.
//!
//! Published on a [`tokio::sync::broadcast`] channel owned by the
//! [`ExecutionMonitor`](crate::monitor::ExecutionMonitor). Subscribers
//! see zero or more events per session; the session's terminal outcome
//! is its return value, and nothing is published after it.

use agentrun_core::{ConnectivityStatus, ExecutionState, JobHandle, ResultPayload};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A status fetch succeeded.
    Progress {
        execution_id: JobHandle,
        state: ExecutionState,
        /// Present once the job is finished and its outputs are complete.
        payload: Option<ResultPayload>,
        connectivity: ConnectivityStatus,
    },

    /// Transport health changed without a new job state.
    ///
    /// `attempt` counts consecutive failed fetches.
    Connectivity {
        execution_id: JobHandle,
        status: ConnectivityStatus,
        attempt: u32,
    },
}

impl MonitorEvent {
    pub fn execution_id(&self) -> &JobHandle {
        match self {
            MonitorEvent::Progress { execution_id, .. } => execution_id,
            MonitorEvent::Connectivity { execution_id, .. } => execution_id,
        }
    }

    pub fn connectivity(&self) -> ConnectivityStatus {
        match self {
            MonitorEvent::Progress { connectivity, .. } => *connectivity,
            MonitorEvent::Connectivity { status, .. } => *status,
        }
    }
}
