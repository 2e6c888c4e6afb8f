//! Filters and the chain that threads a request through them.
//!
//! A [`FilterChain`] is an ordered list of [`Filter`]s ending in a
//! [`Transport`]. Each filter receives the request and a [`Next`] handle to
//! the rest of the chain. Filters run in list order on the way in; whatever
//! a filter does after awaiting `next` runs in reverse order on the way out.
//!
//! ```
//! use storage_pipeline_core::{Filter, FilterChain, Next, PipelineFuture, Request, Response};
//! use http::{HeaderValue, Method, StatusCode, Uri};
//!
//! struct AddVersion;
//!
//! impl Filter for AddVersion {
//!     fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
//!         request
//!             .headers_mut()
//!             .insert("x-ms-version", HeaderValue::from_static("2018-11-09"));
//!         next.run(request)
//!     }
//! }
//!
//! # async fn example() -> Result<(), storage_pipeline_core::PipelineError> {
//! let chain = FilterChain::builder()
//!     .filter(AddVersion)
//!     .transport(storage_pipeline_core::transport_fn(|req: Request| async move {
//!         assert!(req.headers().contains_key("x-ms-version"));
//!         Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
//!     }));
//!
//! let response = chain
//!     .execute(Request::new(Method::GET, Uri::from_static("https://acct.queue.example.net/")))
//!     .await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

use crate::error::PipelineError;
use crate::request::Request;
use crate::response::Response;
use crate::transport::Transport;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future returned by filters, transports and [`Next::run`].
pub type PipelineFuture<'a> = BoxFuture<'a, Result<Response, PipelineError>>;

/// A unit of middleware wrapping the remainder of a chain.
///
/// A filter may mutate the request, decide whether (and how many times) to
/// run `next`, and inspect the outcome before returning it. Skipping `next`
/// short-circuits the chain: downstream filters and the transport never run.
pub trait Filter: Send + Sync + 'static {
    /// Processes `request`, usually by running `next` with it.
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a>;

    /// A short name used in logs and diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handle to the part of a chain after the current filter.
///
/// `Next` is `Copy`, so a filter can run the remainder several times; this
/// is what lets a retry filter resend a request.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn Filter>], transport: &'a dyn Transport) -> Self {
        Self { filters, transport }
    }

    /// Runs the remaining filters, then the transport.
    pub fn run<'r>(self, request: &'r mut Request) -> PipelineFuture<'r>
    where
        'a: 'r,
    {
        match self.filters.split_first() {
            Some((filter, rest)) => filter.apply(
                request,
                Next {
                    filters: rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.send(request),
        }
    }

    /// Number of filters still to run before the transport.
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.filters.len())
            .finish()
    }
}

/// An ordered sequence of filters terminating in a transport.
///
/// Cloning is cheap and clones share the same filters, so one chain can
/// serve many concurrent requests.
#[derive(Clone)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
    transport: Arc<dyn Transport>,
}

impl FilterChain {
    /// Creates a chain from filters in execution order and a transport.
    pub fn new(filters: Vec<Arc<dyn Filter>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            filters: filters.into(),
            transport,
        }
    }

    /// Starts building a chain.
    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::default()
    }

    /// Sends `request` through every filter and the transport.
    pub async fn execute(&self, mut request: Request) -> Result<Response, PipelineError> {
        Next::new(&self.filters, &*self.transport)
            .run(&mut request)
            .await
    }

    /// Names of the filters in execution order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filter_names())
            .finish()
    }
}

impl tower::Service<Request> for FilterChain {
    type Response = Response;
    type Error = PipelineError;
    type Future = BoxFuture<'static, Result<Response, PipelineError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let chain = self.clone();
        Box::pin(async move { chain.execute(request).await })
    }
}

/// Builder for [`FilterChain`].
#[derive(Default)]
pub struct FilterChainBuilder {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChainBuilder {
    /// Appends a filter; filters run in the order they are added.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Filter,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Appends a filter that is shared with other chains.
    pub fn shared_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Terminates the chain with `transport`.
    pub fn transport<T>(self, transport: T) -> FilterChain
    where
        T: Transport,
    {
        FilterChain::new(self.filters, Arc::new(transport))
    }
}
