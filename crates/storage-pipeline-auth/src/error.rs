use storage_pipeline_core::PipelineError;

/// Errors raised while building a signer or signing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// No storage account name was supplied.
    #[error("storage account name is missing")]
    MissingAccount,

    /// The credential could not be used.
    #[error("invalid credential: {0}")]
    InvalidKey(String),

    /// The request cannot be signed as it stands.
    #[error("cannot sign request: {0}")]
    InvalidRequest(String),
}

impl From<SigningError> for PipelineError {
    fn from(error: SigningError) -> Self {
        PipelineError::Signing {
            reason: error.to_string(),
        }
    }
}
