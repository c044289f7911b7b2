/// Unified error handling for the Solr connector
///
/// Every hard failure surfaced to callers is a [`SolrError`]. The variants
/// separate "we could not talk to the server" (`Unreachable`) from "the
/// server rejected our request" (`Remote`), so indexing and admin code can
/// decide how to report the failure.

use std::fmt;
use thiserror::Error;

pub use crate::config::{ConfigError, FieldError};

/// Boxed lower-level cause carried by an [`SolrError::Unreachable`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for connector operations
#[derive(Debug, Error)]
pub enum SolrError {
    /// Configuration errors, reported before any network call
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport failure or non-success status while talking to an endpoint
    #[error("Solr endpoint {endpoint} is not reachable: {message}")]
    Unreachable {
        endpoint: String,
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },

    /// The server answered but reported errors in the response body
    #[error("Solr endpoint {endpoint} rejected the request: {errors}")]
    Remote {
        endpoint: String,
        errors: String,
        status: Option<u16>,
    },

    /// Response bodies that could not be decoded or lack expected fields
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for connector operations
pub type SolrResult<T> = Result<T, SolrError>;

impl SolrError {
    /// Create an unreachable-endpoint error without a status code
    pub fn unreachable<E: Into<String>, M: Into<String>>(endpoint: E, message: M) -> Self {
        SolrError::Unreachable {
            endpoint: endpoint.into(),
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Create an unreachable-endpoint error for a non-success HTTP status
    pub fn http_status<E: Into<String>>(endpoint: E, status: u16) -> Self {
        SolrError::Unreachable {
            endpoint: endpoint.into(),
            message: format!("HTTP status {}", status),
            status: Some(status),
            source: None,
        }
    }

    /// Wrap a transport error raised while talking to `endpoint`
    pub fn transport<E: Into<String>>(endpoint: E, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };

        SolrError::Unreachable {
            endpoint: endpoint.into(),
            message,
            status: err.status().map(|s| s.as_u16()),
            source: Some(Box::new(err)),
        }
    }

    /// Create a remote-reported error
    pub fn remote<E: Into<String>, M: Into<String>>(endpoint: E, errors: M, status: Option<u16>) -> Self {
        SolrError::Remote {
            endpoint: endpoint.into(),
            errors: errors.into(),
            status,
        }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        SolrError::Protocol(message.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        SolrError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code of the failed exchange, if one was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SolrError::Unreachable { status, .. } => *status,
            SolrError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    /// Base URI of the endpoint involved in the failure
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            SolrError::Unreachable { endpoint, .. } => Some(endpoint),
            SolrError::Remote { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// True when the server was reached and rejected the request
    pub fn is_remote(&self) -> bool {
        matches!(self, SolrError::Remote { .. })
    }

    /// True when the underlying transport gave up on a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            SolrError::Unreachable { source: Some(source), .. } => source
                .downcast_ref::<reqwest::Error>()
                .map(reqwest::Error::is_timeout)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SolrError::Config(_) => ErrorSeverity::Critical,
            SolrError::Internal { .. } => ErrorSeverity::Critical,
            SolrError::Unreachable { .. } => ErrorSeverity::Warning,
            SolrError::Remote { .. } => ErrorSeverity::Error,
            SolrError::Protocol(_) => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but don't crash the system
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}
