//! A ready-made predicate for storage services.

use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::context::RetryContext;
use crate::predicate::ShouldRetry;
use http::uri::Authority;
use http::{StatusCode, Uri};
use std::sync::Arc;
use std::time::Duration;
use storage_pipeline_core::{is_retryable_status, Response};

/// Which endpoints retries may be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationMode {
    /// Every attempt goes to the request's own endpoint.
    PrimaryOnly,
    /// Retries alternate between the primary endpoint and this secondary host.
    PrimaryThenSecondary(Authority),
}

/// The primary URI of a call, remembered before the first switch.
#[derive(Debug, Clone)]
struct PrimaryUri(Uri);

/// Set once the secondary answered 404; later attempts stay on the primary.
#[derive(Debug, Clone, Copy)]
struct SecondaryNotFound;

/// Retries transient storage failures a bounded number of times.
///
/// An attempt is retried when:
/// - it failed with a retryable error (transport failure or timeout), or
/// - its response is unsuccessful with status 408 or 5xx other than 501/505.
///
/// Signing and configuration errors are never retried, nor are other 4xx
/// responses. With [`LocationMode::PrimaryThenSecondary`], retries alternate
/// between the primary and secondary endpoints; a 404 from the secondary
/// (data not replicated yet) is retried once on the primary, which is then
/// used for the rest of the call.
///
/// ```
/// use storage_pipeline_retry::{RetryPolicy, StorageRetry};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .predicate(StorageRetry::linear(Duration::from_secs(1)).max_retries(5))
///     .name("queue")
///     .build();
/// # let _ = policy;
/// ```
#[derive(Clone)]
pub struct StorageRetry {
    max_retries: usize,
    interval: Arc<dyn IntervalFunction>,
    location_mode: LocationMode,
}

impl StorageRetry {
    /// Up to 3 retries with exponential backoff starting at 4s, capped at 90s.
    pub fn new() -> Self {
        Self::exponential(Duration::from_secs(4), Duration::from_secs(90))
    }

    /// Up to 3 retries, doubling the wait from `initial` up to `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::with_backoff(ExponentialBackoff::new(initial).max_interval(max))
    }

    /// Up to 3 retries, waiting `interval` before each.
    pub fn linear(interval: Duration) -> Self {
        Self::with_backoff(FixedInterval::new(interval))
    }

    /// Up to 3 retries using a custom backoff.
    pub fn with_backoff<I>(interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        Self {
            max_retries: 3,
            interval: Arc::new(interval),
            location_mode: LocationMode::PrimaryOnly,
        }
    }

    /// Sets the number of retries after the initial attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn location_mode(mut self, location_mode: LocationMode) -> Self {
        self.location_mode = location_mode;
        self
    }

    /// Shorthand for `location_mode(LocationMode::PrimaryThenSecondary(secondary))`.
    pub fn secondary(self, secondary: Authority) -> Self {
        self.location_mode(LocationMode::PrimaryThenSecondary(secondary))
    }

    fn is_retryable(&self, response: Option<&Response>, ctx: &RetryContext) -> bool {
        if let Some(error) = &ctx.error {
            return error.is_retryable();
        }
        match response {
            Some(response) if !response.is_success() => {
                is_retryable_status(response.status())
                    || (response.status() == StatusCode::NOT_FOUND && self.on_secondary(ctx))
            }
            _ => false,
        }
    }

    fn on_secondary(&self, ctx: &RetryContext) -> bool {
        match (&self.location_mode, ctx.request_uri()) {
            (LocationMode::PrimaryThenSecondary(secondary), Some(uri)) => {
                uri.authority() == Some(secondary)
            }
            _ => false,
        }
    }

    fn choose_location(&self, response: Option<&Response>, ctx: &mut RetryContext) {
        let LocationMode::PrimaryThenSecondary(secondary) = &self.location_mode else {
            return;
        };
        let Some(current) = ctx.request_uri().cloned() else {
            return;
        };

        if ctx.extensions().get::<PrimaryUri>().is_none() {
            ctx.extensions_mut().insert(PrimaryUri(current.clone()));
        }

        let on_secondary = self.on_secondary(ctx);
        if on_secondary && response.is_some_and(|r| r.status() == StatusCode::NOT_FOUND) {
            ctx.extensions_mut().insert(SecondaryNotFound);
        }

        let next = if on_secondary || ctx.extensions().get::<SecondaryNotFound>().is_some() {
            ctx.extensions().get::<PrimaryUri>().map(|primary| primary.0.clone())
        } else {
            with_authority(&current, secondary)
        };

        if let Some(uri) = next {
            ctx.uri = Some(uri);
        }
    }
}

impl Default for StorageRetry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StorageRetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRetry")
            .field("max_retries", &self.max_retries)
            .field("location_mode", &self.location_mode)
            .finish()
    }
}

impl ShouldRetry for StorageRetry {
    fn should_retry(&self, response: Option<&Response>, ctx: &mut RetryContext) -> bool {
        let retries = ctx.attempts().saturating_sub(1);
        if retries >= self.max_retries || !self.is_retryable(response, ctx) {
            return false;
        }

        self.choose_location(response, ctx);
        ctx.delay = Some(self.interval.next_interval(retries));
        true
    }
}

fn with_authority(uri: &Uri, authority: &Authority) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    parts.authority = Some(authority.clone());
    Uri::from_parts(parts).ok()
}
