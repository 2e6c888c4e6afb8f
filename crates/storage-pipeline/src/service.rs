//! The composition root: a signed, retrying client for one storage service.

use crate::config::ServiceConfig;
use crate::options::CallOptions;
use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use storage_pipeline_auth::{Signer, SignerFilter, DEFAULT_API_VERSION};
use storage_pipeline_core::{
    Filter, FilterChain, PipelineError, Request, Response, TimeoutFilter, TraceFilter, Transport,
};
use storage_pipeline_retry::RetryPolicy;

const MS_VERSION: &str = "x-ms-version";
const MS_CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Identifies this library in the `User-Agent` header.
pub const USER_AGENT_PRODUCT: &str = concat!("storage-pipeline/", env!("CARGO_PKG_VERSION"));

/// A client that signs, retries and sends requests to a storage service.
///
/// Every [`call`](Self::call) runs through a [`FilterChain`] made of, in order:
/// 1. the retry policy (a single attempt when none was set)
/// 2. the signer (unless the service is anonymous)
/// 3. filters added with [`SignedServiceBuilder::filter`]
/// 4. a [`TraceFilter`] (unless disabled)
/// 5. a [`TimeoutFilter`]
///
/// then the transport. Since the signer runs inside the retry loop, each
/// attempt is signed afresh.
///
/// Cloning is cheap; clones share the chain.
///
/// ```
/// use storage_pipeline::{CallOptions, SignedService};
/// use storage_pipeline::auth::SharedKeySigner;
/// use storage_pipeline::core::{transport_fn, Request, Response};
/// use http::{HeaderMap, Method, StatusCode, Uri};
///
/// # async fn example() -> Result<(), storage_pipeline::core::PipelineError> {
/// let service = SignedService::builder()
///     .signer(SharedKeySigner::new("acct", "c2VjcmV0LWtleQ==")?)
///     .transport(transport_fn(|_req: Request| async {
///         Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
///     }))
///     .build()?;
///
/// let response = service
///     .call(
///         Method::GET,
///         Uri::from_static("https://acct.queue.example.net/q/messages"),
///         None,
///         HeaderMap::new(),
///         CallOptions::new(),
///     )
///     .await?;
/// assert!(response.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SignedService {
    chain: FilterChain,
    api_version: HeaderValue,
    user_agent: HeaderValue,
    default_timeout: Option<Duration>,
    anonymous: bool,
}

impl SignedService {
    pub fn builder() -> SignedServiceBuilder {
        SignedServiceBuilder::new()
    }

    /// Sends a request through the chain.
    ///
    /// `x-ms-version` and `User-Agent` are added unless `headers` already
    /// has them; `x-ms-client-request-id` is set from `options.request_id`.
    pub async fn call(
        &self,
        method: Method,
        uri: Uri,
        body: Option<Bytes>,
        headers: HeaderMap,
        options: CallOptions,
    ) -> Result<Response, PipelineError> {
        let mut request = Request::new(method, uri).with_headers(headers);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let request_headers = request.headers_mut();
        request_headers
            .entry(MS_VERSION)
            .or_insert_with(|| self.api_version.clone());
        request_headers
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        if let Some(request_id) = &options.request_id {
            let value = HeaderValue::from_str(request_id).map_err(|_| {
                PipelineError::Config(format!("request id `{request_id}` is not a valid header value"))
            })?;
            request_headers.insert(MS_CLIENT_REQUEST_ID, value);
        }
        request.set_timeout(options.timeout.or(self.default_timeout));

        self.chain.execute(request).await
    }

    /// The chain every call runs through.
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// `true` if requests are sent without credentials.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

impl fmt::Debug for SignedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedService")
            .field("chain", &self.chain)
            .field("api_version", &self.api_version)
            .field("anonymous", &self.anonymous)
            .finish()
    }
}

enum Auth {
    Signer(Arc<dyn Signer>),
    Anonymous,
}

/// Builder for [`SignedService`].
///
/// A transport and an authentication choice are required: either
/// [`signer`](Self::signer) or an explicit [`anonymous`](Self::anonymous).
pub struct SignedServiceBuilder {
    auth: Option<Auth>,
    retry: Option<RetryPolicy>,
    filters: Vec<Arc<dyn Filter>>,
    transport: Option<Arc<dyn Transport>>,
    api_version: String,
    user_agent_prefix: Option<String>,
    default_timeout: Option<Duration>,
    trace: bool,
}

impl Default for SignedServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedServiceBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - retry: [`RetryPolicy::new`] (one attempt per call, unsuccessful
    ///   responses fail the call)
    /// - api_version: [`DEFAULT_API_VERSION`]
    /// - timeout: none
    /// - tracing filter: enabled
    pub fn new() -> Self {
        Self {
            auth: None,
            retry: None,
            filters: Vec::new(),
            transport: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent_prefix: None,
            default_timeout: None,
            trace: true,
        }
    }

    /// Starts from a [`ServiceConfig`]: its credentials, API version and
    /// user agent prefix.
    ///
    /// Fails when the configuration holds no credentials; call
    /// [`new`](Self::new) and [`anonymous`](Self::anonymous) for
    /// unauthenticated access.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, PipelineError> {
        let mut builder = Self::new()
            .shared_signer(config.signer()?)
            .api_version(config.api_version());
        if let Some(prefix) = config.user_agent_prefix() {
            builder = builder.user_agent_prefix(prefix);
        }
        Ok(builder)
    }

    /// Signs every attempt with `signer`.
    pub fn signer<S>(self, signer: S) -> Self
    where
        S: Signer + 'static,
    {
        self.shared_signer(Arc::new(signer))
    }

    pub fn shared_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.auth = Some(Auth::Signer(signer));
        self
    }

    /// Sends requests without credentials.
    pub fn anonymous(mut self) -> Self {
        self.auth = Some(Auth::Anonymous);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Appends a filter, run after the signer.
    ///
    /// Filters added here see the signed request; changing a signed header
    /// or the URI invalidates the signature.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Filter,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the `x-ms-version` sent with every request.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Prepends an application identifier to the `User-Agent` header.
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the per-attempt deadline for calls that don't set their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Enables or disables request logging through [`TraceFilter`].
    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn build(self) -> Result<SignedService, PipelineError> {
        let transport = self
            .transport
            .ok_or_else(|| PipelineError::Config("a transport is required".to_string()))?;
        let auth = self.auth.ok_or_else(|| {
            PipelineError::Config(
                "no signer configured; set one with `.signer(..)` or opt into `.anonymous()`"
                    .to_string(),
            )
        })?;

        let api_version = HeaderValue::from_str(&self.api_version).map_err(|_| {
            PipelineError::Config(format!("invalid API version `{}`", self.api_version))
        })?;
        let user_agent = match &self.user_agent_prefix {
            Some(prefix) => format!("{prefix} {USER_AGENT_PRODUCT}"),
            None => USER_AGENT_PRODUCT.to_string(),
        };
        let user_agent = HeaderValue::from_str(&user_agent).map_err(|_| {
            PipelineError::Config(format!("invalid user agent `{user_agent}`"))
        })?;

        let mut filters: Vec<Arc<dyn Filter>> = Vec::with_capacity(self.filters.len() + 4);
        filters.push(Arc::new(self.retry.unwrap_or_default()));
        let anonymous = match auth {
            Auth::Signer(signer) => {
                filters.push(Arc::new(SignerFilter::from_arc(signer)));
                false
            }
            Auth::Anonymous => true,
        };
        filters.extend(self.filters);
        if self.trace {
            filters.push(Arc::new(TraceFilter::new()));
        }
        filters.push(Arc::new(TimeoutFilter::new()));

        let chain = FilterChain::new(filters, transport);
        #[cfg(feature = "tracing")]
        tracing::debug!(filters = ?chain.filter_names(), anonymous, "built signed service");

        Ok(SignedService {
            chain,
            api_version,
            user_agent,
            default_timeout: self.default_timeout,
            anonymous,
        })
    }
}
