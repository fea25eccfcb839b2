//! Plain-text rendering of execution results.

use std::fmt::Write;

use agentrun_core::{ResultPayload, Severity, ValidationReport};

/// Shown when a chat job finishes without an answer.
pub const NO_RESPONSE: &str = "No response received";

/// Shown when a validation report has no findings.
pub const NO_WARNINGS: &str = "No warnings or errors found.";

pub fn render_payload(payload: Option<&ResultPayload>) -> String {
    match payload {
        Some(ResultPayload::Chat { answer }) => answer.clone(),
        Some(ResultPayload::Validation(report)) => render_report(report),
        None => NO_RESPONSE.to_string(),
    }
}

pub fn render_report(report: &ValidationReport) -> String {
    let counts = &report.validation_summary;
    let mut out = String::new();

    let _ = writeln!(out, "Validation Results");
    let _ = writeln!(
        out,
        "  Total Rows: {}   Warnings: {}   Errors: {}",
        counts.total_rows, counts.warnings_count, counts.errors_count
    );

    if let Some(summary) = report.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "\nDetailed Summary\n{}", summary.trim_end());
    }

    let _ = writeln!(out, "\nWarnings and Errors");
    if !report.has_findings() {
        let _ = writeln!(out, "{NO_WARNINGS}");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>5}  {:<20}  {:>5}  {:<8}  Message",
        "Row", "Field", "Index", "Severity"
    );
    for warning in &report.warnings {
        let index = warning
            .index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".into());
        let severity = match warning.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        let _ = writeln!(
            out,
            "{:>5}  {:<20}  {:>5}  {:<8}  {}",
            warning.row, warning.field, index, severity, warning.message
        );
    }
    out
}
