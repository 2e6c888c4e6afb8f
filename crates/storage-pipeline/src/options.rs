use std::time::Duration;

/// Per-call settings for [`SignedService::call`](crate::SignedService::call).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Sent as `x-ms-client-request-id`, to correlate client and service logs.
    pub request_id: Option<String>,
    /// Deadline for each attempt, overriding the service default.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
