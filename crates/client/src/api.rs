//! REST client for the agent execution endpoints.
//!
//! [`AgentApi`] wraps the execute and status calls using [`reqwest`].
//! The [`JobSubmitter`] and [`StatusFetcher`] traits are the seams the
//! poll loop depends on, so sessions can run against fakes in tests.

use agentrun_core::{CoreError, ExecutionState, JobHandle, JobRequest, Timestamp};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::classify::{classify, ErrorClass};
use crate::config::ClientConfig;
use crate::messages::{ExecuteRequest, StartResponse, StatusResponse};

/// Current state of an execution as returned by one status call.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub state: ExecutionState,
    pub outputs: Option<serde_json::Value>,
    pub updated_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// Errors from starting a job. Never retried: no job exists yet.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request failed local validation and was not sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Agent API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The service answered but did not hand back an execution id.
    #[error("Service did not return an execution id")]
    MissingExecutionId,
}

/// Errors from a single status fetch.
///
/// Classified by [`classify`](crate::classify::classify) into transient
/// and fatal failures.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No usable response: connection, DNS, reset, timeout, etc.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Agent API error ({status}): {body}")]
    Http { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("Malformed status response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Generic text suitable for end users, chosen by failure class.
    pub fn user_message(&self) -> &'static str {
        match classify(self) {
            ErrorClass::Transient => {
                "The service could not be reached. Please check your network and try again."
            }
            ErrorClass::Fatal => {
                "Sorry, the status of this request could not be retrieved."
            }
        }
    }
}

/// Starts remote jobs.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmitError>;
}

/// Performs exactly one status round trip per call, without retries.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusSnapshot, FetchError>;
}

/// HTTP client for one account/agent pair.
pub struct AgentApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AgentApi {
    /// Create a client with its own connection pool and the configured
    /// per-request timeout.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`] (shared
    /// connection pool across several agents).
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn execute_url(&self) -> String {
        format!(
            "{}/{}/agent/{}/execute",
            self.config.base_url, self.config.account_id, self.config.agent_id
        )
    }

    fn status_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/{}/agent/{}/status",
            self.config.base_url, self.config.account_id, handle
        )
    }

    /// Validate and submit a job; returns its execution handle.
    pub async fn start_execution(&self, request: &JobRequest) -> Result<JobHandle, SubmitError> {
        request.validate()?;
        let inputs = request.to_inputs()?;

        let response = self
            .client
            .post(self.execute_url())
            .bearer_auth(&self.config.api_token)
            .json(&ExecuteRequest { inputs: &inputs })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SubmitError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let start: StartResponse = decode(&body).map_err(SubmitError::Decode)?;
        let handle = start
            .execution_id
            .filter(|id| !id.trim().is_empty())
            .map(JobHandle::new)
            .ok_or(SubmitError::MissingExecutionId)?;

        tracing::info!(
            execution_id = %handle,
            agent_id = %self.config.agent_id,
            "Execution started",
        );
        Ok(handle)
    }

    /// Fetch the current status of an execution.
    pub async fn get_execution_status(
        &self,
        handle: &JobHandle,
    ) -> Result<StatusSnapshot, FetchError> {
        let response = self
            .client
            .get(self.status_url(handle))
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: StatusResponse = decode(&body).map_err(FetchError::Decode)?;
        tracing::debug!(
            execution_id = %handle,
            state = %parsed.execution.status,
            "Fetched execution status",
        );

        Ok(StatusSnapshot {
            state: parsed.execution.status,
            outputs: parsed.execution.outputs,
            updated_at: parsed.execution.updated_at,
            finished_at: parsed.execution.finished_at,
        })
    }
}

#[async_trait]
impl JobSubmitter for AgentApi {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmitError> {
        self.start_execution(request).await
    }
}

#[async_trait]
impl StatusFetcher for AgentApi {
    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusSnapshot, FetchError> {
        self.get_execution_status(handle).await
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    serde_json::from_str(body).map_err(|e| e.to_string())
}
