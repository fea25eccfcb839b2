//! Transient vs. fatal classification of status-fetch failures.

use std::io::ErrorKind;

use crate::api::FetchError;

/// Whether a failed fetch is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network flakiness or a server-side 5xx; expected to clear up.
    Transient,
    /// Retrying will not help: 4xx, malformed body, bad request.
    Fatal,
}

/// Label a fetch failure as [`ErrorClass::Transient`] or [`ErrorClass::Fatal`].
///
/// | Failure                                         | Class       |
/// |-------------------------------------------------|-------------|
/// | connect / DNS / timeout / body read             | `Transient` |
/// | connection reset, aborted or broken pipe        | `Transient` |
/// | HTTP status >= 500                              | `Transient` |
/// | HTTP 4xx and other non-2xx                      | `Fatal`     |
/// | malformed body, request building, redirects     | `Fatal`     |
/// | TLS and other send-time failures                | `Fatal`     |
pub fn classify(error: &FetchError) -> ErrorClass {
    match error {
        FetchError::Http { status, .. } => status_class(*status),
        FetchError::Transport(e) => {
            if let Some(status) = e.status() {
                return status_class(status.as_u16());
            }
            if e.is_connect() || e.is_timeout() || e.is_body() {
                ErrorClass::Transient
            } else if e.is_request() && caused_by_reset(e) {
                // Send-time failures are only worth retrying when the peer
                // dropped the connection; TLS and protocol errors are not.
                ErrorClass::Transient
            } else {
                ErrorClass::Fatal
            }
        }
        FetchError::Decode(_) => ErrorClass::Fatal,
    }
}

/// Whether `error` or anything in its source chain is an I/O error from the
/// peer resetting or abandoning the connection.
fn caused_by_reset(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(cause) = current {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        current = cause.source();
    }
    false
}

fn status_class(status: u16) -> ErrorClass {
    if status >= 500 {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}
