use crate::error::PipelineError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Header carrying the service's machine-readable error code.
pub const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// A response returned by the transport.
///
/// Whether a response counts as successful is decided once, by whoever
/// builds it: [`Response::new`] classifies 2xx as success, and a transport
/// with different rules can override that with [`Response::with_success`].
/// Filters only read the flag.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    success: bool,
}

impl Response {
    /// Creates an empty response, successful iff `status` is 2xx.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            success: status.is_success(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Overrides the status-derived success classification.
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The error this response carries, `None` when it is successful.
    ///
    /// An unsuccessful response always yields a [`PipelineError::Status`],
    /// with the service error code when the `x-ms-error-code` header is set
    /// and the body text (or canonical reason) as the message.
    pub fn error(&self) -> Option<PipelineError> {
        if self.success {
            return None;
        }

        let code = self
            .headers
            .get(ERROR_CODE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let text = String::from_utf8_lossy(&self.body);
        let message = match text.trim() {
            "" => self
                .status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
            body => body.to_string(),
        };

        Some(PipelineError::Status {
            status: self.status,
            code,
            message,
        })
    }
}
