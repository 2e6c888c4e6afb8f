use crate::context::RetryContext;
use crate::events::{RetryEvent, RetryListeners};
use crate::predicate::{FnPredicate, NeverRetry, ShouldRetry};
use crate::RetryPolicy;
use http::Uri;
use std::sync::Arc;
use std::time::Duration;
use storage_pipeline_core::Response;

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder {
    template: RetryContext,
    predicate: Option<Arc<dyn ShouldRetry>>,
    listeners: RetryListeners,
    name: String,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicyBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - template: an empty [`RetryContext`]
    /// - predicate: [`NeverRetry`] (one attempt per call)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            template: RetryContext::new(),
            predicate: None,
            listeners: RetryListeners::default(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Replaces the template context cloned at the start of every call.
    pub fn template(mut self, template: RetryContext) -> Self {
        self.template = template;
        self
    }

    /// Sends the first attempt of every call to `uri` instead of the request's own.
    pub fn initial_uri(mut self, uri: Uri) -> Self {
        self.template.uri = Some(uri);
        self
    }

    /// Seeds a value into the template's extensions.
    pub fn extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.template.extensions_mut().insert(value);
        self
    }

    /// Sets the predicate consulted after every attempt.
    pub fn predicate<P>(mut self, predicate: P) -> Self
    where
        P: ShouldRetry + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets a closure as the predicate.
    ///
    /// ```
    /// use storage_pipeline_retry::RetryPolicy;
    ///
    /// // Retry connection failures twice.
    /// let policy = RetryPolicy::builder()
    ///     .retry_if(|response, ctx| response.is_none() && ctx.attempts() < 3)
    ///     .build();
    /// # let _ = policy;
    /// ```
    pub fn retry_if<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Response>, &mut RetryContext) -> bool + Send + Sync + 'static,
    {
        self.predicate(FnPredicate::new(f))
    }

    /// Sets the name for this policy (used in events, logs and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback run before each retry.
    ///
    /// Called with the attempt that just finished (1 = the initial attempt)
    /// and the delay the predicate asked for.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.listeners.push(move |event: &RetryEvent| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        });
        self
    }

    /// Registers a callback run when a call returns a response, with the
    /// total number of attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.push(move |event: &RetryEvent| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback run when a call fails for good.
    ///
    /// ```rust,no_run
    /// use storage_pipeline_retry::{RetryPolicy, StorageRetry};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let failures = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&failures);
    ///
    /// let policy = RetryPolicy::builder()
    ///     .predicate(StorageRetry::new())
    ///     .on_error(move |attempts| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///         println!("gave up after {} attempts", attempts);
    ///     })
    ///     .build();
    /// ```
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.push(move |event: &RetryEvent| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        });
        self
    }

    /// Registers a callback that sees every [`RetryEvent`].
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.listeners.push(f);
        self
    }

    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            template: Arc::new(self.template),
            predicate: self.predicate.unwrap_or_else(|| Arc::new(NeverRetry)),
            listeners: self.listeners,
            name: self.name.into(),
        }
    }
}
