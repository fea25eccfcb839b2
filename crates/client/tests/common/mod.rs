//! Shared test fixtures: scripted and stalled status fetchers, and a submitter.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use agentrun_client::{
    FetchError, JobSubmitter, MonitorConfig, StatusFetcher, StatusSnapshot, SubmitError,
};
use agentrun_core::{ExecutionState, JobHandle, JobRequest};
use async_trait::async_trait;
use serde_json::json;

/// One scripted response from the fake service.
#[derive(Debug, Clone)]
pub enum Step {
    State(ExecutionState, Option<serde_json::Value>),
    Http(u16),
    Malformed,
}

impl Step {
    pub fn queued() -> Self {
        Step::State(ExecutionState::Queued, None)
    }

    pub fn running() -> Self {
        Step::State(ExecutionState::Running, None)
    }

    pub fn failed() -> Self {
        Step::State(ExecutionState::Failed, None)
    }

    pub fn answer(text: &str) -> Self {
        Step::State(ExecutionState::Finished, Some(json!({ "aianswer": text })))
    }

    pub fn finished_empty() -> Self {
        Step::State(ExecutionState::Finished, None)
    }

    fn into_result(self) -> Result<StatusSnapshot, FetchError> {
        match self {
            Step::State(state, outputs) => Ok(StatusSnapshot {
                state,
                outputs,
                updated_at: None,
                finished_at: None,
            }),
            Step::Http(status) => Err(FetchError::Http {
                status,
                body: format!("status {status}"),
            }),
            Step::Malformed => Err(FetchError::Decode("expected value at line 1".into())),
        }
    }
}

/// Replays `script` in order, then repeats `fallback` forever.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn repeating(step: Step) -> Self {
        Self::new([]).then_forever(step)
    }

    pub fn then_forever(mut self, step: Step) -> Self {
        self.fallback = Some(step);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetcher for ScriptedFetcher {
    async fn fetch_status(&self, _handle: &JobHandle) -> Result<StatusSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .expect("fetcher script exhausted")
            .into_result()
    }
}

/// Fetcher whose requests never complete, like a server that accepts the
/// connection and then goes silent.
#[derive(Default)]
pub struct StalledFetcher {
    calls: AtomicU32,
}

impl StalledFetcher {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusFetcher for StalledFetcher {
    async fn fetch_status(&self, _handle: &JobHandle) -> Result<StatusSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Submitter that hands out a fixed handle, or fails with an HTTP status.
pub struct FakeSubmitter {
    pub outcome: Result<&'static str, u16>,
    pub calls: AtomicU32,
}

impl FakeSubmitter {
    pub fn ok(id: &'static str) -> Self {
        Self {
            outcome: Ok(id),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            outcome: Err(status),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl JobSubmitter for FakeSubmitter {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        request.validate()?;
        match self.outcome {
            Ok(id) => Ok(JobHandle::new(id)),
            Err(status) => Err(SubmitError::Api {
                status,
                body: String::new(),
            }),
        }
    }
}

/// Default polling policy: 5 s cadence, 5 retries, 1..10 s backoff, 10 min budget.
pub fn config() -> MonitorConfig {
    MonitorConfig::default()
}

pub fn config_with_timeout(timeout: Duration) -> MonitorConfig {
    MonitorConfig {
        session_timeout: timeout,
        ..MonitorConfig::default()
    }
}
