use crate::filter::{Filter, Next, PipelineFuture};
use crate::request::Request;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Logs every request passing through it, and its outcome.
///
/// Each call runs inside a `storage_request` span carrying the method,
/// host and path. The query string is left out of logs because it may hold
/// a shared access signature.
#[derive(Debug, Clone, Default)]
pub struct TraceFilter;

impl TraceFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for TraceFilter {
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
        let span = tracing::debug_span!(
            "storage_request",
            method = %request.method(),
            host = request.uri().host().unwrap_or_default(),
            path = request.uri().path(),
        );

        Box::pin(
            async move {
                let started = Instant::now();
                tracing::debug!(body_len = request.content_length(), "sending request");

                let result = next.run(request).await;
                let elapsed_ms = millis(started.elapsed());
                match &result {
                    Ok(response) if response.is_success() => {
                        tracing::debug!(status = %response.status(), elapsed_ms, "request succeeded");
                    }
                    Ok(response) => {
                        tracing::warn!(status = %response.status(), elapsed_ms, "request unsuccessful");
                    }
                    Err(error) => {
                        tracing::warn!(%error, elapsed_ms, "request failed");
                    }
                }
                result
            }
            .instrument(span),
        )
    }

    fn name(&self) -> &str {
        "trace"
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
