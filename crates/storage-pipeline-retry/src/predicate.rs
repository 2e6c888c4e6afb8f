use crate::context::RetryContext;
use storage_pipeline_core::Response;

/// Decides whether a [`RetryPolicy`](crate::RetryPolicy) sends the request again.
///
/// Called once after every attempt with the response, if one arrived, and
/// the call's [`RetryContext`]. When the attempt failed without a response,
/// `response` is `None` and the failure is in `ctx.error`. Returning `true`
/// starts another attempt; `false` ends the loop.
///
/// The policy puts no bound on the number of attempts. A predicate that
/// keeps returning `true` loops forever, so implementations must cap
/// attempts themselves (see [`RetryContext::attempts`]).
///
/// Predicates can steer the next attempt through the context: setting
/// `ctx.uri` redirects it, setting `ctx.delay` makes the policy wait first.
pub trait ShouldRetry: Send + Sync {
    fn should_retry(&self, response: Option<&Response>, ctx: &mut RetryContext) -> bool;
}

/// The default predicate: a single attempt, never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl ShouldRetry for NeverRetry {
    fn should_retry(&self, _response: Option<&Response>, _ctx: &mut RetryContext) -> bool {
        false
    }
}

/// Adapts a closure into a [`ShouldRetry`] predicate.
///
/// Usually created through [`RetryPolicyBuilder::retry_if`](crate::RetryPolicyBuilder::retry_if).
pub struct FnPredicate<F> {
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(Option<&Response>, &mut RetryContext) -> bool + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ShouldRetry for FnPredicate<F>
where
    F: Fn(Option<&Response>, &mut RetryContext) -> bool + Send + Sync,
{
    fn should_retry(&self, response: Option<&Response>, ctx: &mut RetryContext) -> bool {
        (self.f)(response, ctx)
    }
}

impl<P> ShouldRetry for std::sync::Arc<P>
where
    P: ShouldRetry + ?Sized,
{
    fn should_retry(&self, response: Option<&Response>, ctx: &mut RetryContext) -> bool {
        (**self).should_retry(response, ctx)
    }
}
