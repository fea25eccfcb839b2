//! Execution monitor: the bounded long-poll loop.
//!
//! [`ExecutionMonitor`] drives one polling session per job handle:
//! fetch status, publish progress, back off on transient failures and
//! resolve to exactly one terminal outcome. Every fetch and every wait
//! is raced against a [`CancellationToken`], and a session never outlives
//! [`MonitorConfig::session_timeout`], not even while a status request
//! is still in flight.
//!
//! ```text
//! STARTING -> POLLING -> SUCCEEDED
//!                     \-> FAILED   (job failed, fatal error, retries exhausted, timeout)
//! ```

use std::sync::Arc;
use std::time::Duration;

use agentrun_core::{
    ConnectivityStatus, ExecutionState, JobHandle, PayloadKind, ResultPayload, SessionPhase,
    Timestamp,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::{StatusFetcher, SubmitError};
use crate::classify::{classify, ErrorClass};
use crate::config::MonitorConfig;
use crate::events::MonitorEvent;

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Stand-in deadline when `session_timeout` does not fit in an `Instant`.
const UNBOUNDED_SESSION: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Terminal success of a session.
///
/// `payload` is `None` when the job finished but its outputs lacked the
/// fields the caller asked for.
#[derive(Debug, Clone)]
pub struct Completion {
    pub execution_id: JobHandle,
    pub state: ExecutionState,
    pub payload: Option<ResultPayload>,
    pub finished_at: Option<Timestamp>,
}

impl Completion {
    /// Require content, turning an empty success into
    /// [`MonitorError::IncompletePayload`].
    pub fn into_payload(self) -> Result<ResultPayload, MonitorError> {
        self.payload.ok_or(MonitorError::IncompletePayload {
            execution_id: self.execution_id,
        })
    }
}

/// Why a session (or the submission before it) did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The job was never started.
    #[error("Failed to start execution: {0}")]
    Submission(#[from] SubmitError),

    /// Too many consecutive transient transport failures.
    #[error("Lost connection to the agent service after {attempts} attempts: {last_error}")]
    ConnectivityExhausted { attempts: u32, last_error: String },

    /// Unrecoverable status-fetch failure (4xx, malformed response).
    #[error("Status check failed: {0}")]
    Fatal(String),

    /// The service reported that the job itself failed.
    #[error("Execution {execution_id} failed")]
    JobFailed { execution_id: JobHandle },

    /// The session ran past its wall-clock budget.
    #[error("Execution timed out after {}s", .elapsed.as_secs())]
    Timeout { elapsed: Duration },

    /// The job finished but produced no usable output.
    #[error("Execution {execution_id} finished without a result")]
    IncompletePayload { execution_id: JobHandle },

    /// The caller stopped the session.
    #[error("Monitoring was cancelled")]
    Cancelled,
}

impl MonitorError {
    /// Generic text suitable for end users. Raw diagnostics stay in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            MonitorError::Submission(SubmitError::InvalidRequest(_)) => {
                "Please fill in all required fields."
            }
            MonitorError::Submission(_) => {
                "The request could not be started. Please try again."
            }
            MonitorError::ConnectivityExhausted { .. } => {
                "Connection to the service was lost. Please check your network and try again."
            }
            MonitorError::Fatal(_) => {
                "Sorry, I encountered an error while processing your request. Please try again."
            }
            MonitorError::JobFailed { .. } => "The request failed while being processed.",
            MonitorError::Timeout { .. } => "The request took too long to complete.",
            MonitorError::IncompletePayload { .. } => "No response received.",
            MonitorError::Cancelled => "The request was cancelled.",
        }
    }
}

/// Mutable state of one polling session. Dropped when the loop returns.
struct PollSession<'a> {
    handle: &'a JobHandle,
    started: Instant,
    consecutive_errors: u32,
    last_state: Option<ExecutionState>,
    phase: SessionPhase,
}

impl<'a> PollSession<'a> {
    fn new(handle: &'a JobHandle) -> Self {
        Self {
            handle,
            started: Instant::now(),
            consecutive_errors: 0,
            last_state: None,
            phase: SessionPhase::Starting,
        }
    }
}

/// Polls execution status through a [`StatusFetcher`].
///
/// Shareable via `Arc`; each [`watch`](Self::watch) call is an
/// independent session with no state shared between sessions.
pub struct ExecutionMonitor {
    fetcher: Arc<dyn StatusFetcher>,
    config: MonitorConfig,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl ExecutionMonitor {
    pub fn new(fetcher: Arc<dyn StatusFetcher>, config: MonitorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            config,
            event_tx,
        }
    }

    /// Subscribe to progress events from every session of this monitor.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Poll `handle` until it reaches a terminal outcome.
    pub async fn watch(
        &self,
        handle: &JobHandle,
        kind: PayloadKind,
        cancel: &CancellationToken,
    ) -> Result<Completion, MonitorError> {
        let mut session = PollSession::new(handle);
        tracing::info!(execution_id = %handle, "Monitoring execution");

        let result = self.run_session(&mut session, kind, cancel).await;

        match &result {
            Ok(completion) => tracing::info!(
                execution_id = %handle,
                has_payload = completion.payload.is_some(),
                elapsed_ms = session.started.elapsed().as_millis() as u64,
                "Execution finished",
            ),
            Err(e) => tracing::warn!(
                execution_id = %handle,
                phase = ?session.phase,
                last_state = ?session.last_state,
                error = %e,
                "Execution monitoring ended without success",
            ),
        }
        result
    }

    /// Run [`watch`](Self::watch) on a background task.
    ///
    /// Dropping the returned [`MonitorTask`] cancels the session.
    pub fn spawn(self: &Arc<Self>, handle: JobHandle, kind: PayloadKind) -> MonitorTask {
        let cancel = CancellationToken::new();
        let monitor = Arc::clone(self);
        let task_cancel = cancel.clone();

        let join = tokio::spawn(async move { monitor.watch(&handle, kind, &task_cancel).await });

        MonitorTask {
            join,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
        }
    }

    async fn run_session(
        &self,
        session: &mut PollSession<'_>,
        kind: PayloadKind,
        cancel: &CancellationToken,
    ) -> Result<Completion, MonitorError> {
        let handle = session.handle;
        let deadline = session
            .started
            .checked_add(self.config.session_timeout)
            .unwrap_or_else(|| session.started + UNBOUNDED_SESSION);

        loop {
            if cancel.is_cancelled() {
                return Err(MonitorError::Cancelled);
            }

            let elapsed = session.started.elapsed();
            if elapsed >= self.config.session_timeout {
                session.phase = SessionPhase::Failed;
                return Err(MonitorError::Timeout { elapsed });
            }
            session.phase = SessionPhase::Polling;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MonitorError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    session.phase = SessionPhase::Failed;
                    tracing::warn!(
                        execution_id = %handle,
                        "Status request outlived the session",
                    );
                    return Err(MonitorError::Timeout {
                        elapsed: session.started.elapsed(),
                    });
                }
                result = self.fetcher.fetch_status(handle) => result,
            };

            match fetched {
                Ok(snapshot) => {
                    session.consecutive_errors = 0;
                    session.last_state = Some(snapshot.state);

                    let payload = match snapshot.state {
                        ExecutionState::Finished => kind.extract(snapshot.outputs.as_ref()),
                        _ => None,
                    };
                    self.publish(MonitorEvent::Progress {
                        execution_id: handle.clone(),
                        state: snapshot.state,
                        payload: payload.clone(),
                        connectivity: ConnectivityStatus::Connected,
                    });

                    match snapshot.state {
                        ExecutionState::Finished => {
                            session.phase = SessionPhase::Succeeded;
                            if payload.is_none() {
                                tracing::warn!(
                                    execution_id = %handle,
                                    "Execution finished without the expected outputs",
                                );
                            }
                            return Ok(Completion {
                                execution_id: handle.clone(),
                                state: snapshot.state,
                                payload,
                                finished_at: snapshot.finished_at,
                            });
                        }
                        ExecutionState::Failed => {
                            session.phase = SessionPhase::Failed;
                            return Err(MonitorError::JobFailed {
                                execution_id: handle.clone(),
                            });
                        }
                        ExecutionState::Queued | ExecutionState::Running => {
                            tracing::debug!(
                                execution_id = %handle,
                                state = %snapshot.state,
                                "Execution in progress",
                            );
                            self.wait(session, self.config.poll_interval, cancel).await?;
                        }
                    }
                }
                Err(error) => match classify(&error) {
                    ErrorClass::Transient => {
                        session.consecutive_errors += 1;
                        let attempt = session.consecutive_errors;

                        if attempt > self.config.max_retries {
                            session.phase = SessionPhase::Failed;
                            tracing::error!(
                                execution_id = %handle,
                                attempt,
                                error = %error,
                                "Giving up after repeated connection failures",
                            );
                            self.publish(MonitorEvent::Connectivity {
                                execution_id: handle.clone(),
                                status: ConnectivityStatus::Failed,
                                attempt,
                            });
                            return Err(MonitorError::ConnectivityExhausted {
                                attempts: attempt,
                                last_error: error.to_string(),
                            });
                        }

                        let delay = self.config.backoff.delay(attempt - 1);
                        tracing::warn!(
                            execution_id = %handle,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Transient status failure, retrying",
                        );
                        self.publish(MonitorEvent::Connectivity {
                            execution_id: handle.clone(),
                            status: ConnectivityStatus::Retrying,
                            attempt,
                        });
                        self.wait(session, delay, cancel).await?;
                    }
                    ErrorClass::Fatal => {
                        session.phase = SessionPhase::Failed;
                        self.publish(MonitorEvent::Connectivity {
                            execution_id: handle.clone(),
                            status: ConnectivityStatus::Failed,
                            attempt: session.consecutive_errors + 1,
                        });
                        return Err(MonitorError::Fatal(error.to_string()));
                    }
                },
            }
        }
    }

    /// Sleep for `delay`, clamped to what is left of the session budget.
    async fn wait(
        &self,
        session: &PollSession<'_>,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), MonitorError> {
        let remaining = self
            .config
            .session_timeout
            .saturating_sub(session.started.elapsed());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MonitorError::Cancelled),
            _ = tokio::time::sleep(delay.min(remaining)) => Ok(()),
        }
    }

    fn publish(&self, event: MonitorEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.event_tx.send(event);
    }
}

/// A session running on a background task.
///
/// Dropping it cancels the session, so an abandoned session stops
/// polling promptly.
pub struct MonitorTask {
    join: JoinHandle<Result<Completion, MonitorError>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl MonitorTask {
    /// Ask the session to stop; [`join`](Self::join) then yields
    /// [`MonitorError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session's terminal outcome.
    pub async fn join(self) -> Result<Completion, MonitorError> {
        let MonitorTask { join, _guard, .. } = self;
        match join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(MonitorError::Cancelled),
            Err(e) => Err(MonitorError::Fatal(format!("monitor task panicked: {e}"))),
        }
    }
}
