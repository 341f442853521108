use thiserror::Error;

/// Every remote-service client returns this on failure (C7, spec §4.6/§7).
/// `is_retryable` is the single bit the saga executor dispatches on; it is
/// computed once, here, from the §6.2 per-endpoint status-code table so
/// callers never re-derive it.
#[derive(Debug, Error, Clone)]
#[error("{operation} failed: {reason}")]
pub struct RemoteError {
    pub operation: &'static str,
    pub reason: String,
    pub status_code: Option<u16>,
    pub is_retryable: bool,
}

impl RemoteError {
    pub fn transport(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
            status_code: None,
            is_retryable: true,
        }
    }

    pub fn retryable(operation: &'static str, status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
            status_code: Some(status_code),
            is_retryable: true,
        }
    }

    pub fn permanent(operation: &'static str, status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
            status_code: Some(status_code),
            is_retryable: false,
        }
    }

    pub fn decode_failure(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
            status_code: None,
            is_retryable: false,
        }
    }
}
