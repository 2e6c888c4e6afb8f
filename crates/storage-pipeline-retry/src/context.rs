use http::{Extensions, Uri};
use std::time::Duration;
use storage_pipeline_core::PipelineError;

/// Working state of one retry loop.
///
/// A [`RetryPolicy`](crate::RetryPolicy) clones its template context at the
/// start of every call, so whatever a predicate stores here lives exactly as
/// long as that call's attempts and is never seen by another call.
///
/// Besides the reserved slots below, predicates can keep their own state
/// (counters, timestamps, flags) in the typed [`extensions`](Self::extensions).
///
/// ```
/// use storage_pipeline_retry::RetryContext;
///
/// #[derive(Clone, Default)]
/// struct Timeouts(u32);
///
/// let mut ctx = RetryContext::new();
/// let seen = ctx.extensions().get::<Timeouts>().map_or(0, |t| t.0);
/// ctx.extensions_mut().insert(Timeouts(seen + 1));
/// assert_eq!(ctx.extensions().get::<Timeouts>().map(|t| t.0), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// URI to send the next attempt to; `None` keeps the current one.
    pub uri: Option<Uri>,
    /// The error captured on the most recent attempt.
    pub error: Option<PipelineError>,
    /// How long to wait before the next attempt.
    pub delay: Option<Duration>,
    attempts: usize,
    request_uri: Option<Uri>,
    extensions: Extensions,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URI used for the first attempt.
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Seeds a caller-defined value, visible to the predicate on every call.
    pub fn with_extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Number of attempts made so far in this call, including the current one.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The URI the most recent attempt was sent to.
    pub fn request_uri(&self) -> Option<&Uri> {
        self.request_uri.as_ref()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn begin_attempt(&mut self, uri: &Uri) {
        self.error = None;
        self.attempts += 1;
        self.request_uri = Some(uri.clone());
    }
}
