//! Core of the storage request pipeline.
//!
//! This crate provides what every other storage-pipeline crate builds on:
//! - [`Request`] and [`Response`] values flowing through a chain
//! - [`Filter`], [`Next`] and [`FilterChain`] for composing middleware
//! - the [`Transport`] boundary, with a Tower adapter
//! - [`PipelineError`], the single error type of a chain
//! - [`TimeoutFilter`] and [`TraceFilter`]

pub mod error;
pub mod filter;
mod request;
mod response;
mod timeout;
mod trace;
pub mod transport;

pub use error::{is_retryable_status, BoxError, PipelineError};
pub use filter::{Filter, FilterChain, FilterChainBuilder, Next, PipelineFuture};
pub use request::Request;
pub use response::{Response, ERROR_CODE_HEADER};
pub use timeout::TimeoutFilter;
pub use trace::TraceFilter;
pub use transport::{transport_fn, ServiceTransport, Transport};

#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
