//! Unified error types for remote scenario execution.
//!
//! Every crate in the workspace maps its failures into [`AppError`] so the
//! orchestrator can tell a cancelled run from a failed one with a single
//! `kind` check.

use std::fmt;
use thiserror::Error;

/// Error category used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Transport failure or a non-2xx HTTP response.
    Request,
    /// The login exchange failed or no credentials were available.
    Authentication,
    /// The remote service rejected the job submission.
    Submission,
    /// The remote service refused to execute the job, or the job ended badly.
    Execution,
    /// A layer upload exhausted its retries or could not be finalized.
    Upload,
    /// The job never reached a terminal status within the check ceiling.
    PollTimeout,
    /// Cooperative cancellation was observed.
    Cancelled,
    /// The remote scenario detail could not be turned into a result.
    Assembly,
    /// Output files were still missing after the download batch ceiling.
    PartialOutput,
    /// Local file or key-value store I/O failed.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// Input validation failed.
    Validation,
    /// The requested item was not found.
    NotFound,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "REQUEST"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Submission => write!(f, "SUBMISSION"),
            Self::Execution => write!(f, "EXECUTION"),
            Self::Upload => write!(f, "UPLOAD"),
            Self::PollTimeout => write!(f, "POLL_TIMEOUT"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Assembly => write!(f, "ASSEMBLY"),
            Self::PartialOutput => write!(f, "PARTIAL_OUTPUT"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the workspace.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// HTTP status code, when the error came from a response.
    pub status: Option<u16>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a request error for a non-2xx response.
    ///
    /// The message carries both the status code and the response body.
    pub fn http(name: &str, status: u16, body: &str) -> Self {
        Self {
            kind: ErrorKind::Request,
            message: format!("{name} failed with HTTP {status}: {body}"),
            status: Some(status),
            source: None,
        }
    }

    /// Create a transport-level request error (no response received).
    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a submission error.
    pub fn submission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Submission, message)
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    /// Create an upload error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upload, message)
    }

    /// Create a poll-timeout error.
    pub fn poll_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PollTimeout, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an assembly error.
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Assembly, message)
    }

    /// Create a partial-output error.
    pub fn partial_output(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PartialOutput, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error represents cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            status: self.status,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Invalid configuration: {err}"),
            err,
        )
    }
}
