use http::StatusCode;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// What a [`RetryPolicy`](crate::RetryPolicy) reports to its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent {
    /// The predicate asked for another attempt.
    Retry {
        policy: Arc<str>,
        /// The attempt that just finished (1 = the initial attempt).
        attempt: usize,
        /// Wait before the next attempt.
        delay: Duration,
        /// Status of the response that was retried, `None` after an error.
        status: Option<StatusCode>,
    },
    /// The call returned a response.
    Success { policy: Arc<str>, attempts: usize },
    /// The call failed with the error of its last attempt.
    Error { policy: Arc<str>, attempts: usize },
}

impl RetryEvent {
    /// Name of the policy that emitted the event.
    pub fn policy(&self) -> &str {
        match self {
            RetryEvent::Retry { policy, .. }
            | RetryEvent::Success { policy, .. }
            | RetryEvent::Error { policy, .. } => policy,
        }
    }

    /// Attempts made so far in the call.
    pub fn attempts(&self) -> usize {
        match self {
            RetryEvent::Retry { attempt, .. } => *attempt,
            RetryEvent::Success { attempts, .. } | RetryEvent::Error { attempts, .. } => *attempts,
        }
    }
}

type Listener = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Callbacks registered on a policy, run in registration order.
#[derive(Clone, Default)]
pub(crate) struct RetryListeners {
    listeners: Vec<Listener>,
}

impl RetryListeners {
    pub(crate) fn push<F>(&mut self, listener: F)
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Runs every listener; a panicking listener neither stops the others
    /// nor unwinds into the request.
    pub(crate) fn notify(&self, event: &RetryEvent) {
        for listener in &self.listeners {
            let _ = catch_unwind(AssertUnwindSafe(|| listener(event)));
        }
    }
}

impl fmt::Debug for RetryListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
