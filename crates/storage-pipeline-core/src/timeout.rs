use crate::error::PipelineError;
use crate::filter::{Filter, Next, PipelineFuture};
use crate::request::Request;
use std::time::Duration;

/// Bounds each attempt by a deadline.
///
/// The deadline is the request's own [`timeout`](Request::timeout) if set,
/// otherwise the filter default. An attempt that runs past it is dropped and
/// reported as [`PipelineError::Timeout`], which a retry filter further out
/// sees like any other transport failure.
///
/// Place it after filters that should not be cut short (retries, signing),
/// normally right before the transport.
#[derive(Debug, Clone, Default)]
pub struct TimeoutFilter {
    default: Option<Duration>,
}

impl TimeoutFilter {
    /// A filter that only honours per-request timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter applying `timeout` to requests that don't set their own.
    pub fn with_default(timeout: Duration) -> Self {
        Self {
            default: Some(timeout),
        }
    }
}

impl Filter for TimeoutFilter {
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
        let Some(after) = request.timeout().or(self.default) else {
            return next.run(request);
        };

        Box::pin(async move {
            match tokio::time::timeout(after, next.run(request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(timeout = ?after, "storage request timed out");
                    Err(PipelineError::Timeout { after })
                }
            }
        })
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
