//! Signed, retrying request pipeline for cloud storage clients.
//!
//! `storage-pipeline` wires the workspace crates into a ready-to-use client
//! core. Per-resource operations (list queues, put message, ...) build a
//! URI and headers and hand them to [`SignedService::call`]; everything
//! between that call and the wire is a [`FilterChain`](core::FilterChain):
//!
//! ```text
//! call ─▶ RetryPolicy ─▶ SignerFilter ─▶ your filters ─▶ TraceFilter ─▶ TimeoutFilter ─▶ Transport
//! ```
//!
//! # Crates
//!
//! - [`core`]: requests, responses, errors, filters and transports
//! - [`retry`]: the retry policy, its predicates and backoff
//! - [`auth`]: Shared Key and SAS signing
//!
//! # Example
//!
//! ```rust,no_run
//! use storage_pipeline::{CallOptions, ServiceConfig, SignedServiceBuilder, StorageKind};
//! use storage_pipeline::retry::{LocationMode, RetryPolicy, StorageRetry};
//! use storage_pipeline::core::{transport_fn, Request, Response};
//! use http::{HeaderMap, Method, StatusCode};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), storage_pipeline::core::PipelineError> {
//! let config = ServiceConfig::from_env()?;
//! let primary = config.endpoint(StorageKind::Queue)?;
//!
//! let mut predicate = StorageRetry::exponential(Duration::from_secs(1), Duration::from_secs(30));
//! if let Some(secondary) = config.secondary_endpoint(StorageKind::Queue)? {
//!     if let Some(authority) = secondary.authority() {
//!         predicate = predicate.location_mode(LocationMode::PrimaryThenSecondary(authority.clone()));
//!     }
//! }
//!
//! let service = SignedServiceBuilder::from_config(&config)?
//!     .retry(RetryPolicy::builder().predicate(predicate).name("queue").build())
//!     .timeout(Duration::from_secs(30))
//!     .transport(transport_fn(|_req: Request| async {
//!         Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
//!     }))
//!     .build()?;
//!
//! let uri = format!("{primary}myqueue/messages?numofmessages=1")
//!     .parse()
//!     .map_err(|e| storage_pipeline::core::PipelineError::Config(format!("{e}")))?;
//! service
//!     .call(Method::GET, uri, None, HeaderMap::new(), CallOptions::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod options;
mod service;

pub use storage_pipeline_auth as auth;
pub use storage_pipeline_core as core;
pub use storage_pipeline_retry as retry;

pub use config::{
    ServiceConfig, ServiceConfigBuilder, StorageKind, DEVELOPMENT_ACCOUNT, DEVELOPMENT_KEY,
    ENV_ACCESS_KEY, ENV_ACCOUNT, ENV_CONNECTION_STRING, ENV_SAS_TOKEN,
};
pub use options::CallOptions;
pub use service::{SignedService, SignedServiceBuilder, USER_AGENT_PRODUCT};

pub use storage_pipeline_core::{PipelineError, Request, Response};
