use std::fmt;
use thiserror::Error;

/// The error type for qcos operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    part_number: Option<u32>,
    abort_error: Option<Box<Error>>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller input: a foreign request, an empty bucket, a bad URL.
    InvalidArgument,

    /// Signature validity window is empty or inverted.
    InvalidScope,

    /// Secret material is missing or empty.
    InvalidCredentials,

    /// The operation name is not one the client knows how to build.
    UnknownOperation,

    /// Required operation parameters are missing or malformed.
    InvalidParams,

    /// Network or HTTP failure while dispatching a request.
    Dispatch,

    /// One part of a multipart upload could not be uploaded.
    PartUploadFailed,

    /// The service rejected the submitted part list.
    CompletionMismatch,

    /// Aborting a multipart upload failed.
    AbortFailed,

    /// The caller cancelled the operation.
    Cancelled,

    /// Unexpected errors (I/O, malformed responses, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            part_number: None,
            abort_error: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the number of the part this error belongs to.
    pub fn with_part_number(mut self, part_number: u32) -> Self {
        self.part_number = Some(part_number);
        self
    }

    /// Attach the error returned by a best-effort abort.
    ///
    /// The abort error is kept next to the original one instead of
    /// replacing it.
    pub fn with_abort_error(mut self, err: Error) -> Self {
        self.abort_error = Some(Box::new(err));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Part number of the failing part, if this error came from a part upload.
    pub fn part_number(&self) -> Option<u32> {
        self.part_number
    }

    /// Error raised while aborting the upload that failed with this error.
    pub fn abort_error(&self) -> Option<&Error> {
        self.abort_error.as_deref()
    }

    /// Check if this is a caller input error
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidArgument
                | ErrorKind::InvalidScope
                | ErrorKind::InvalidCredentials
                | ErrorKind::UnknownOperation
                | ErrorKind::InvalidParams
        )
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an invalid scope error
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, message)
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, message)
    }

    /// Create an unknown operation error
    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownOperation,
            format!("unknown operation: {name}"),
        )
    }

    /// Create an invalid params error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dispatch, message)
    }

    /// Create a part upload error for the given part.
    pub fn part_upload_failed(part_number: u32) -> Self {
        Self::new(
            ErrorKind::PartUploadFailed,
            format!("upload part {part_number} failed"),
        )
        .with_part_number(part_number)
    }

    /// Create a completion mismatch error
    pub fn completion_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompletionMismatch, message)
    }

    /// Create an abort failed error
    pub fn abort_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AbortFailed, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
            ErrorKind::InvalidScope => write!(f, "invalid signature scope"),
            ErrorKind::InvalidCredentials => write!(f, "invalid credentials"),
            ErrorKind::UnknownOperation => write!(f, "unknown operation"),
            ErrorKind::InvalidParams => write!(f, "invalid operation params"),
            ErrorKind::Dispatch => write!(f, "dispatch failed"),
            ErrorKind::PartUploadFailed => write!(f, "part upload failed"),
            ErrorKind::CompletionMismatch => write!(f, "completion mismatch"),
            ErrorKind::AbortFailed => write!(f, "abort failed"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
