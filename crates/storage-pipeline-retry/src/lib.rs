//! Predicate-driven retry for the storage request pipeline.
//!
//! [`RetryPolicy`] is a [`Filter`] that runs the rest of the chain, asks a
//! [`ShouldRetry`] predicate whether to go again, and repeats. Each call
//! gets its own [`RetryContext`], cloned from a template fixed when the
//! policy is built, in which the predicate can redirect the next attempt
//! (`ctx.uri`), request a backoff (`ctx.delay`) or keep its own state.
//!
//! # Features
//!
//! - **Predicate hook**: [`ShouldRetry`], with closures via
//!   [`RetryPolicyBuilder::retry_if`]
//! - **Built-in storage predicate**: [`StorageRetry`], with secondary
//!   endpoint alternation
//! - **IntervalFunction abstraction**: fixed, linear, exponential and
//!   randomized backoff
//! - **Listeners**: `on_retry`, `on_success`, `on_error` and `on_event` callbacks
//!
//! # Examples
//!
//! ```
//! use storage_pipeline_core::{transport_fn, FilterChain, Request, Response};
//! use storage_pipeline_retry::{RetryPolicy, StorageRetry};
//! use http::{Method, StatusCode, Uri};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), storage_pipeline_core::PipelineError> {
//! let retry = RetryPolicy::builder()
//!     .predicate(StorageRetry::linear(Duration::from_millis(100)))
//!     .on_retry(|attempt, delay| {
//!         println!("attempt {} failed, retrying in {:?}", attempt, delay);
//!     })
//!     .build();
//!
//! let chain = FilterChain::builder()
//!     .filter(retry)
//!     .transport(transport_fn(|_req: Request| async {
//!         Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
//!     }));
//!
//! let uri = Uri::from_static("https://acct.queue.example.net/q/messages");
//! chain.execute(Request::new(Method::GET, uri)).await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod context;
mod events;
mod predicate;
mod storage;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
    LinearBackoff,
};
pub use config::RetryPolicyBuilder;
pub use context::RetryContext;
pub use events::RetryEvent;
use events::RetryListeners;
pub use predicate::{FnPredicate, NeverRetry, ShouldRetry};
pub use storage::{LocationMode, StorageRetry};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::fmt;
use std::sync::Arc;
use storage_pipeline_core::{Filter, Next, PipelineError, PipelineFuture, Request, Response};

/// A [`Filter`] that re-runs the rest of the chain while its predicate asks for it.
///
/// Per call:
/// 1. the template context is cloned into a fresh working context;
/// 2. before every attempt, `ctx.uri` (if set) replaces the request URI,
///    and `ctx.error` is cleared;
/// 3. a failed attempt is stored in `ctx.error`;
/// 4. the predicate sees the response (if any) and the context, and may
///    set `ctx.delay` to wait before the next attempt.
///
/// When the loop ends, an unsuccessful final response is turned into its
/// carried error. The call fails with `ctx.error` if there is one and
/// returns the response otherwise.
///
/// Cloning is cheap; clones share the template, predicate and listeners.
#[derive(Clone)]
pub struct RetryPolicy {
    template: Arc<RetryContext>,
    predicate: Arc<dyn ShouldRetry>,
    listeners: RetryListeners,
    name: Arc<str>,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn new() -> Self {
        RetryPolicyBuilder::new().build()
    }

    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// The context every call starts from.
    pub fn template(&self) -> &RetryContext {
        &self.template
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, event: impl FnOnce(Arc<str>) -> RetryEvent) {
        if !self.listeners.is_empty() {
            self.listeners.notify(&event(Arc::clone(&self.name)));
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("name", &self.name)
            .field("template", &self.template)
            .finish()
    }
}

impl Filter for RetryPolicy {
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
        Box::pin(async move {
            let mut ctx = RetryContext::clone(&self.template);

            let response = loop {
                if let Some(uri) = ctx.uri.clone() {
                    request.set_uri(uri);
                }
                ctx.begin_attempt(request.uri());

                #[cfg(feature = "metrics")]
                counter!("storage_retry_attempts_total", "retry" => self.name.to_string())
                    .increment(1);

                let response = match next.run(&mut *request).await {
                    Ok(response) => Some(response),
                    Err(error) => {
                        ctx.error = Some(error);
                        None
                    }
                };

                if !self.predicate.should_retry(response.as_ref(), &mut ctx) {
                    break response;
                }

                let delay = ctx.delay.take().unwrap_or_default();

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    policy = %self.name,
                    attempt = ctx.attempts(),
                    ?delay,
                    status = response.as_ref().map(|r| r.status().as_u16()),
                    error = ctx.error.as_ref().map(tracing::field::display),
                    "retrying request"
                );

                let attempt = ctx.attempts();
                let status = response.as_ref().map(Response::status);
                self.emit(|policy| RetryEvent::Retry {
                    policy,
                    attempt,
                    delay,
                    status,
                });

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            };

            if let Some(error) = response.as_ref().and_then(Response::error) {
                ctx.error = Some(error);
            }

            let attempts = ctx.attempts();
            let outcome = match (ctx.error.take(), response) {
                (Some(error), _) => Err(error),
                (None, Some(response)) => Ok(response),
                (None, None) => Err(PipelineError::Config(
                    "retry predicate discarded the error of the final attempt".to_string(),
                )),
            };

            #[cfg(feature = "metrics")]
            counter!(
                "storage_retry_calls_total",
                "retry" => self.name.to_string(),
                "result" => if outcome.is_ok() { "success" } else { "error" }
            )
            .increment(1);
            #[cfg(feature = "metrics")]
            histogram!("storage_retry_attempts", "retry" => self.name.to_string())
                .record(attempts as f64);

            match &outcome {
                Ok(_) => self.emit(|policy| RetryEvent::Success { policy, attempts }),
                Err(_error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(policy = %self.name, attempts, error = %_error, "request failed");

                    self.emit(|policy| RetryEvent::Error { policy, attempts });
                }
            }

            outcome
        })
    }

    fn name(&self) -> &str {
        "retry"
    }
}
