//! Error types shared by every stage of the pipeline.
//!
//! [`PipelineError`] is the single error type that flows through a
//! [`FilterChain`](crate::FilterChain). Filter crates convert their own
//! errors into it (for example the signing crate provides
//! `impl From<SigningError> for PipelineError`), so a chain built from any
//! mix of filters exposes one error type to its caller.
//!
//! # Categories
//!
//! | variant | raised by | retryable |
//! |---|---|---|
//! | [`Transport`](PipelineError::Transport) | the terminal send | yes |
//! | [`Timeout`](PipelineError::Timeout) | [`TimeoutFilter`](crate::TimeoutFilter) | yes |
//! | [`Status`](PipelineError::Status) | an unsuccessful [`Response`](crate::Response) | depends on status |
//! | [`Signing`](PipelineError::Signing) | a signer | no |
//! | [`Config`](PipelineError::Config) | builders | no |
//!
//! ```
//! use storage_pipeline_core::PipelineError;
//! use std::time::Duration;
//!
//! let err = PipelineError::Timeout { after: Duration::from_secs(5) };
//! assert!(err.is_timeout());
//! assert!(err.is_retryable());
//!
//! let err = PipelineError::Signing { reason: "account key is not valid base64".into() };
//! assert!(!err.is_retryable());
//! ```

use http::StatusCode;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Boxed error accepted from transports.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The error type produced by filters, transports and the chain itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// The request could not be delivered (connection refused, reset, TLS failure...).
    #[error("transport error: {source}")]
    Transport {
        /// The underlying transport error.
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// No response arrived before the per-attempt deadline.
    #[error("request timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A response arrived but was classified as unsuccessful.
    #[error("request failed with status {status} ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
    Status {
        /// The HTTP status of the response.
        status: StatusCode,
        /// The service error code, when the service reported one.
        code: Option<String>,
        /// The response body, or the canonical reason when the body was empty.
        message: String,
    },

    /// The request could not be authenticated.
    #[error("failed to sign request: {reason}")]
    Signing {
        /// Why signing failed.
        reason: String,
    },

    /// The pipeline was assembled from an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wraps an arbitrary transport error.
    ///
    /// Boxed `PipelineError`s are unwrapped rather than nested, so a
    /// transport that already speaks `PipelineError` keeps its variant.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        let boxed: BoxError = error.into();
        match boxed.downcast::<PipelineError>() {
            Ok(err) => *err,
            Err(other) => PipelineError::Transport {
                source: Arc::from(other),
            },
        }
    }

    /// Returns `true` if sending the same request again may succeed.
    ///
    /// Transport failures and timeouts are retryable. Status failures are
    /// retryable for 408 and for 5xx except 501 and 505. Signing and
    /// configuration errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Transport { .. } | PipelineError::Timeout { .. } => true,
            PipelineError::Status { status, .. } => is_retryable_status(*status),
            PipelineError::Signing { .. } | PipelineError::Config(_) => false,
        }
    }

    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }

    /// Returns `true` if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Transport { .. })
    }

    /// Returns `true` if this is a signing failure.
    pub fn is_signing(&self) -> bool {
        matches!(self, PipelineError::Signing { .. })
    }

    /// Returns the response status for [`Status`](PipelineError::Status) errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PipelineError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the service error code for [`Status`](PipelineError::Status) errors.
    pub fn code(&self) -> Option<&str> {
        match self {
            PipelineError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Status codes worth another attempt: 408 and 5xx except 501 and 505.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || (status.is_server_error()
            && status != StatusCode::NOT_IMPLEMENTED
            && status != StatusCode::HTTP_VERSION_NOT_SUPPORTED)
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
