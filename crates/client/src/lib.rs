//! Long-poll client for a remote asynchronous agent-execution service.
//!
//! Submits a job, polls its status until the server reports a terminal
//! state, retries transient transport failures with exponential backoff,
//! enforces a session-wide timeout and resolves to exactly one outcome.
//! Progress is published on a broadcast channel so any number of
//! consumers can follow a session.

pub mod api;
pub mod backoff;
pub mod classify;
pub mod config;
pub mod events;
pub mod messages;
pub mod monitor;
pub mod runner;

pub use api::{AgentApi, FetchError, JobSubmitter, StatusFetcher, StatusSnapshot, SubmitError};
pub use backoff::BackoffPolicy;
pub use classify::{classify, ErrorClass};
pub use config::{ClientConfig, ConfigError, MonitorConfig};
pub use events::MonitorEvent;
pub use monitor::{Completion, ExecutionMonitor, MonitorError, MonitorTask};
pub use runner::JobRunner;
