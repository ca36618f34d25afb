//! Errors raised by integration code (handlers and hooks).
//!
//! Batch-level errors live next to the component that raises them
//! (`app::processor::BatchError`, `app::validator::ValidationError`, ...).

use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Operational classification of a handler failure.
///
/// - Transient: the downstream call may succeed if the host retries.
/// - Permanent: retrying the same record will fail again (bad payload, rejected data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Failure of a single record's handler.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of the once-per-batch setup hook. Always fatal to the batch.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SetupError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SetupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_keeps_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
        let err = HandlerError::transient("forward failed").with_source(io);

        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "forward failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("upstream timed out"));
    }

    #[test]
    fn permanent_is_not_retryable() {
        assert!(!HandlerError::permanent("bad").is_retryable());
        assert_eq!(SetupError::new("no session").to_string(), "no session");
    }
}
