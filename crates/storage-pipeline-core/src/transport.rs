//! The terminal step of a chain: actually sending the request.
//!
//! Connection pooling, DNS and TLS belong to whatever sits behind a
//! [`Transport`]. Any Tower service from [`Request`] to [`Response`] can be
//! used through [`ServiceTransport`]; with the `reqwest` feature enabled,
//! [`ReqwestTransport`] sends over HTTP.

use crate::error::{BoxError, PipelineError};
use crate::filter::PipelineFuture;
use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use tower::util::ServiceFn;
use tower::{Service, ServiceExt};

/// Sends a fully prepared request and returns the service's response.
///
/// Connectivity failures, TLS errors and the like are reported as
/// [`PipelineError::Transport`]; an unsuccessful HTTP status is *not* an
/// error at this level and comes back as a [`Response`].
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(&'a self, request: &'a Request) -> PipelineFuture<'a>;
}

/// Adapts a Tower service into a [`Transport`].
///
/// The service is cloned for every send, following the usual Tower
/// convention for sharing a service between concurrent callers. Errors are
/// converted with [`PipelineError::transport`].
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    inner: S,
}

impl<S> ServiceTransport<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request, Response = Response> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    fn send<'a>(&'a self, request: &'a Request) -> PipelineFuture<'a> {
        let service = self.inner.clone();
        let request = request.clone();
        Box::pin(async move {
            service
                .oneshot(request)
                .await
                .map_err(PipelineError::transport)
        })
    }
}

/// Builds a [`Transport`] from an async function, in the manner of
/// [`tower::service_fn`].
///
/// ```
/// use storage_pipeline_core::{transport_fn, Request, Response};
/// use http::StatusCode;
///
/// let transport = transport_fn(|_req: Request| async {
///     Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
/// });
/// # let _ = transport;
/// ```
pub fn transport_fn<F, Fut, E>(f: F) -> ServiceTransport<ServiceFn<F>>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response, E>>,
{
    ServiceTransport::new(tower::service_fn(f))
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::*;

    /// Sends requests with a shared [`reqwest::Client`].
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Transport for ReqwestTransport {
        fn send<'a>(&'a self, request: &'a Request) -> PipelineFuture<'a> {
            Box::pin(async move {
                let mut builder = self
                    .client
                    .request(request.method().clone(), request.uri().to_string())
                    .headers(request.headers().clone());
                if let Some(body) = request.body() {
                    builder = builder.body(body.clone());
                }

                let response = builder.send().await.map_err(PipelineError::transport)?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().await.map_err(PipelineError::transport)?;

                Ok(Response::new(status).with_headers(headers).with_body(body))
            })
        }
    }
}
