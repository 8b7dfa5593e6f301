// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Error types for aura-file

use std::io;
use thiserror::Error;

/// Error type for file handle operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error reported by the OS for a finished transfer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Engine creation failed
    #[error("Failed to create engine: {0}")]
    EngineCreate(#[source] io::Error),

    /// The descriptor could not be bound to the completion backend
    #[error("Failed to register file: {0}")]
    Register(#[source] io::Error),

    /// The current file position could not be queried
    #[error("Failed to query file position: {0}")]
    Position(#[source] io::Error),

    /// The OS rejected the request outright (neither completed nor pending)
    #[error("Submission failed: {0}")]
    Submission(#[source] io::Error),

    /// Operation not supported (multi-buffer I/O, end-relative offsets)
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// The handle is closing or its descriptor has been shut down
    #[error("File handle is closing or shut down")]
    Closed,

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type alias for aura-file operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error from a raw errno value
    pub fn from_raw_os_error(code: i32) -> Self {
        Error::Io(io::Error::from_raw_os_error(code))
    }

    /// The OS error code carried by this error, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Io(e)
            | Error::EngineCreate(e)
            | Error::Register(e)
            | Error::Position(e)
            | Error::Submission(e) => e.raw_os_error(),
            Error::Unsupported(_) | Error::Closed | Error::InvalidArgument(_) => None,
        }
    }

    /// Whether this is an unsupported-operation rejection
    ///
    /// These are raised before any state changes and are safe to retry
    /// with corrected arguments.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_register_has_source() {
        let err = Error::Register(io::Error::from_raw_os_error(libc::EBADF));

        assert!(err.source().is_some(), "Register should have a source");
        assert!(err.source().unwrap().is::<io::Error>());
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn test_position_has_source() {
        let err = Error::Position(io::Error::from_raw_os_error(libc::ESPIPE));

        assert!(err.source().is_some(), "Position should have a source");
        assert_eq!(err.raw_os_error(), Some(libc::ESPIPE));
    }

    #[test]
    fn test_submission_has_source() {
        let io_err = io::Error::new(io::ErrorKind::WouldBlock, "queue full");
        let err = Error::Submission(io_err);

        assert!(err.source().is_some(), "Submission should have a source");
        assert!(err.source().unwrap().is::<io::Error>());
    }

    #[test]
    fn test_unsupported_has_no_source() {
        let err = Error::Unsupported("multi-buffer I/O");

        assert!(err.source().is_none());
        assert!(err.is_unsupported());
        assert_eq!(err.raw_os_error(), None);
    }

    #[test]
    fn test_closed_display() {
        assert_eq!(Error::Closed.to_string(), "File handle is closing or shut down");
        assert!(!Error::Closed.is_unsupported());
    }

    #[test]
    fn test_from_raw_os_error() {
        let err = Error::from_raw_os_error(libc::EIO);
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
