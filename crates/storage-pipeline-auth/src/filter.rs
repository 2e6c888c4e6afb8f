use crate::signer::Signer;
use std::fmt;
use std::sync::Arc;
use storage_pipeline_core::{Filter, Next, PipelineError, PipelineFuture, Request};

/// A [`Filter`] that signs each request before passing it on.
///
/// If signing fails the call fails with [`PipelineError::Signing`] and the
/// rest of the chain, transport included, never runs. Placed after a retry
/// policy, it re-signs every attempt.
#[derive(Clone)]
pub struct SignerFilter {
    signer: Arc<dyn Signer>,
}

impl SignerFilter {
    pub fn new<S>(signer: S) -> Self
    where
        S: Signer + 'static,
    {
        Self {
            signer: Arc::new(signer),
        }
    }

    /// Creates a filter around a signer that is shared elsewhere.
    pub fn from_arc(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }
}

impl fmt::Debug for SignerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerFilter").finish_non_exhaustive()
    }
}

impl Filter for SignerFilter {
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
        Box::pin(async move {
            if let Err(error) = self.signer.sign(request) {
                #[cfg(feature = "tracing")]
                tracing::warn!(uri = %request.uri(), error = %error, "failed to sign request");

                return Err(PipelineError::from(error));
            }
            next.run(request).await
        })
    }

    fn name(&self) -> &str {
        "signer"
    }
}
