//! Error types shared across the crate.
//!
//! The engine itself has no error taxonomy: stages encode failures in their
//! own item types and cancellation travels structurally through relays. The
//! variants here cover the ambient surface around it (configuration, joining
//! worker tasks, logging setup).

use std::fmt;

/// Result alias used throughout conveyor.
pub type ConveyorResult<T> = Result<T, ConveyorError>;

#[derive(Debug, thiserror::Error)]
pub enum ConveyorError {
    /// Configuration values rejected by `PipelineConfig::sanitize`.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A relay task panicked or was aborted before reporting.
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Returned by [`SequenceSender::send`](crate::SequenceSender::send) when the
/// consumer side of the sequence is gone. Carries the undelivered item back.
#[derive(thiserror::Error)]
#[error("sequence consumer is gone")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Recover the item that could not be delivered.
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Written by hand so `T` needs no `Debug` bound.
impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_error_returns_item() {
        let err = SendError(vec![1, 2, 3]);
        assert_eq!(err.to_string(), "sequence consumer is gone");
        assert_eq!(err.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_send_error_without_debug_item() {
        struct Opaque;
        let err: Box<dyn std::error::Error> = Box::new(SendError(Opaque));
        assert_eq!(err.to_string(), "sequence consumer is gone");
        assert!(format!("{:?}", err).starts_with("SendError"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: ConveyorError = io.into();
        assert!(matches!(err, ConveyorError::Io(_)));
        assert!(err.to_string().contains("missing.json"));
    }
}
