//! Domain types shared by the agent execution client and its front-ends.
//!
//! Nothing in this crate performs I/O. It defines the job handle, the
//! server-driven execution state, the request shapes submitted to the
//! remote agent and the result payloads extracted from its outputs.

pub mod error;
pub mod execution;
pub mod payload;
pub mod request;
pub mod types;

pub use error::CoreError;
pub use execution::{ConnectivityStatus, ExecutionState, SessionPhase};
pub use payload::{
    PayloadKind, ResultPayload, Severity, ValidationReport, ValidationSummary, ValidationWarning,
};
pub use request::{ChatRequest, FileData, JobRequest, ScheduleInputs};
pub use types::{JobHandle, Timestamp};
