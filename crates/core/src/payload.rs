//! Result payloads extracted from a finished execution's outputs.

use serde::{Deserialize, Serialize};

/// Output key carrying the chat agent's answer.
pub const CHAT_ANSWER_KEY: &str = "aianswer";

/// Output key under which the validation agent may nest its report.
pub const VALIDATION_RESULTS_KEY: &str = "validationResults";

/// Which payload shape a caller expects from a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Chat,
    Validation,
}

/// Domain output of a finished execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultPayload {
    Chat { answer: String },
    Validation(ValidationReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One finding from the schedule validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub row: u64,
    pub field: String,
    #[serde(default)]
    pub index: Option<u64>,
    pub message: String,
    pub severity: Severity,
}

/// Row and finding counts for a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_rows: u64,
    pub warnings_count: u64,
    pub errors_count: u64,
}

/// Structured report returned by the schedule validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    #[serde(default)]
    pub warnings: Vec<ValidationWarning>,
    /// Markdown text, passed through verbatim.
    #[serde(default)]
    pub summary: Option<String>,
    pub validation_summary: ValidationSummary,
}

impl ValidationReport {
    pub fn has_findings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl PayloadKind {
    /// Pull the expected payload out of raw execution outputs.
    ///
    /// Returns `None` when the required fields are missing or malformed.
    /// A finished job without usable outputs is still a success, just one
    /// without content.
    pub fn extract(self, outputs: Option<&serde_json::Value>) -> Option<ResultPayload> {
        let outputs = outputs?;
        match self {
            PayloadKind::Chat => outputs
                .get(CHAT_ANSWER_KEY)
                .and_then(|v| v.as_str())
                .filter(|answer| !answer.trim().is_empty())
                .map(|answer| ResultPayload::Chat {
                    answer: answer.to_string(),
                }),
            PayloadKind::Validation => extract_report(outputs).map(ResultPayload::Validation),
        }
    }
}

fn extract_report(outputs: &serde_json::Value) -> Option<ValidationReport> {
    match outputs.get(VALIDATION_RESULTS_KEY) {
        // Some agent builds emit the report as a JSON-encoded string.
        Some(serde_json::Value::String(raw)) => serde_json::from_str(raw).ok(),
        Some(nested) => ValidationReport::deserialize(nested).ok(),
        None => ValidationReport::deserialize(outputs).ok(),
    }
}
