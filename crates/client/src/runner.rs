//! Submit-then-watch orchestration used by front-ends.

use std::sync::Arc;

use agentrun_core::JobRequest;
use tokio_util::sync::CancellationToken;

use crate::api::{AgentApi, JobSubmitter};
use crate::config::MonitorConfig;
use crate::monitor::{Completion, ExecutionMonitor, MonitorError};

/// Starts a job and follows it to a terminal outcome.
pub struct JobRunner {
    submitter: Arc<dyn JobSubmitter>,
    monitor: Arc<ExecutionMonitor>,
}

impl JobRunner {
    pub fn new(submitter: Arc<dyn JobSubmitter>, monitor: Arc<ExecutionMonitor>) -> Self {
        Self { submitter, monitor }
    }

    /// Build a runner whose submitter and fetcher share one [`AgentApi`].
    pub fn from_api(api: Arc<AgentApi>, config: MonitorConfig) -> Self {
        let monitor = Arc::new(ExecutionMonitor::new(api.clone(), config));
        Self::new(api, monitor)
    }

    pub fn monitor(&self) -> &Arc<ExecutionMonitor> {
        &self.monitor
    }

    /// Submit `request` and poll until it finishes, fails or times out.
    ///
    /// Submission failures are returned immediately as
    /// [`MonitorError::Submission`]; they are never retried.
    pub async fn run(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion, MonitorError> {
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
            submitted = self.submitter.submit(request) => submitted?,
        };

        self.monitor
            .watch(&handle, request.payload_kind(), cancel)
            .await
    }
}
