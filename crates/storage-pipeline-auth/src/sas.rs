use crate::error::SigningError;
use crate::signer::Signer;
use http::uri::PathAndQuery;
use http::Uri;
use std::fmt;
use storage_pipeline_core::Request;

/// Authorizes requests with a pre-issued shared access signature.
///
/// The token's parameters are appended to the request's query string.
/// Re-signing a request that already carries the token leaves it unchanged.
#[derive(Clone)]
pub struct SasSigner {
    token: String,
}

impl SasSigner {
    /// Creates a signer from a SAS token, with or without its leading `?`.
    pub fn new(token: impl AsRef<str>) -> Result<Self, SigningError> {
        let token = token.as_ref().trim().trim_start_matches('?');
        if token.is_empty() {
            return Err(SigningError::InvalidKey("SAS token is empty".to_string()));
        }
        if !url::form_urlencoded::parse(token.as_bytes()).any(|(name, _)| name == "sig") {
            return Err(SigningError::InvalidKey(
                "SAS token has no `sig` parameter".to_string(),
            ));
        }
        Ok(Self {
            token: token.to_string(),
        })
    }

    fn already_signed(&self, query: &str) -> bool {
        query
            .split('&')
            .any(|pair| pair.starts_with("sig=") && self.token.split('&').any(|own| own == pair))
    }
}

impl Signer for SasSigner {
    fn sign(&self, request: &mut Request) -> Result<(), SigningError> {
        let uri = request.uri();
        let query = uri.query().unwrap_or_default();
        if self.already_signed(query) {
            return Ok(());
        }

        let path_and_query = match (uri.path(), query) {
            (path, "") => format!("{}?{}", path, self.token),
            (path, query) => format!("{}?{}&{}", path, query, self.token),
        };
        let path_and_query = PathAndQuery::try_from(path_and_query)
            .map_err(|e| SigningError::InvalidRequest(e.to_string()))?;

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query);
        let uri = Uri::from_parts(parts).map_err(|e| SigningError::InvalidRequest(e.to_string()))?;
        request.set_uri(uri);
        Ok(())
    }
}

impl fmt::Debug for SasSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasSigner").finish_non_exhaustive()
    }
}
