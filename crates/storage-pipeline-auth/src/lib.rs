//! Request signing for the storage request pipeline.
//!
//! A [`Signer`] authenticates a [`Request`](storage_pipeline_core::Request)
//! in place. [`SignerFilter`] runs one as a step of a
//! [`FilterChain`](storage_pipeline_core::FilterChain); put it after the
//! retry policy so every attempt carries a fresh signature.
//!
//! Two signers are provided:
//! - [`SharedKeySigner`]: HMAC-SHA256 over the canonicalized request, keyed
//!   with the account key
//! - [`SasSigner`]: appends a pre-issued shared access signature
//!
//! # Examples
//!
//! ```
//! use storage_pipeline_auth::{SharedKeySigner, SignerFilter};
//! use storage_pipeline_core::{transport_fn, FilterChain, Request, Response};
//! use http::StatusCode;
//!
//! # fn example() -> Result<(), storage_pipeline_auth::SigningError> {
//! let signer = SharedKeySigner::new("acct", "c2VjcmV0LWtleQ==")?;
//! let chain = FilterChain::builder()
//!     .filter(SignerFilter::new(signer))
//!     .transport(transport_fn(|req: Request| async move {
//!         assert!(req.headers().contains_key("authorization"));
//!         Ok::<_, std::io::Error>(Response::new(StatusCode::OK))
//!     }));
//! # let _ = chain;
//! # Ok(())
//! # }
//! ```

mod error;
mod filter;
mod sas;
mod shared_key;
mod signer;

pub use error::SigningError;
pub use filter::SignerFilter;
pub use sas::SasSigner;
pub use shared_key::{rfc1123, SharedKeySigner, DEFAULT_API_VERSION};
pub use signer::Signer;
