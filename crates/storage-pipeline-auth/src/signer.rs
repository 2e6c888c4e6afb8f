use crate::error::SigningError;
use std::sync::Arc;
use storage_pipeline_core::Request;

/// Authenticates a request in place, typically by adding headers or query
/// parameters derived from a credential.
///
/// Signers are shared between concurrent calls and may be invoked several
/// times for the same logical request (once per retry attempt), so signing
/// must replace rather than accumulate what an earlier pass added.
pub trait Signer: Send + Sync {
    fn sign(&self, request: &mut Request) -> Result<(), SigningError>;
}

impl<S> Signer for Arc<S>
where
    S: Signer + ?Sized,
{
    fn sign(&self, request: &mut Request) -> Result<(), SigningError> {
        (**self).sign(request)
    }
}

impl<S> Signer for Box<S>
where
    S: Signer + ?Sized,
{
    fn sign(&self, request: &mut Request) -> Result<(), SigningError> {
        (**self).sign(request)
    }
}
