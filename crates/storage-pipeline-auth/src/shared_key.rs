//! Shared Key authorization.
//!
//! The signature is an HMAC-SHA256, keyed with the decoded account key, over
//! a canonical rendering of the request:
//!
//! ```text
//! VERB
//! Content-Encoding
//! Content-Language
//! Content-Length          (empty when zero)
//! Content-MD5
//! Content-Type
//! Date
//! If-Modified-Since
//! If-Match
//! If-None-Match
//! If-Unmodified-Since
//! Range
//! x-ms-*:value            (one line per header, sorted by name)
//! /account/path           (then one "\nname:v1,v2" line per query parameter)
//! ```

use crate::error::SigningError;
use crate::signer::Signer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::header::{self, HeaderValue};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;
use storage_pipeline_core::Request;

type HmacSha256 = Hmac<Sha256>;

/// Service version stamped on requests that don't carry one.
pub const DEFAULT_API_VERSION: &str = "2018-11-09";

const MS_DATE: &str = "x-ms-date";
const MS_VERSION: &str = "x-ms-version";

const STANDARD_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Signs requests with a storage account name and key.
///
/// ```
/// use storage_pipeline_auth::{SharedKeySigner, Signer};
/// use storage_pipeline_core::Request;
/// use http::{Method, Uri};
///
/// let signer = SharedKeySigner::new("acct", "c2VjcmV0LWtleQ==")?;
/// let mut request = Request::new(
///     Method::GET,
///     Uri::from_static("https://acct.queue.example.net/q/messages?peekonly=true"),
/// );
/// signer.sign(&mut request)?;
///
/// let auth = request.headers()["authorization"].to_str().unwrap();
/// assert!(auth.starts_with("SharedKey acct:"));
/// # Ok::<(), storage_pipeline_auth::SigningError>(())
/// ```
#[derive(Clone)]
pub struct SharedKeySigner {
    account_name: String,
    key: Vec<u8>,
    api_version: String,
}

impl SharedKeySigner {
    /// Creates a signer from an account name and its base64-encoded key.
    pub fn new(
        account_name: impl Into<String>,
        account_key: impl AsRef<str>,
    ) -> Result<Self, SigningError> {
        let account_name = account_name.into();
        if account_name.trim().is_empty() {
            return Err(SigningError::MissingAccount);
        }

        let key = STANDARD
            .decode(account_key.as_ref().trim())
            .map_err(|e| SigningError::InvalidKey(format!("account key is not valid base64: {e}")))?;
        if key.is_empty() {
            return Err(SigningError::InvalidKey("account key is empty".to_string()));
        }

        Ok(Self {
            account_name,
            key,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Sets the `x-ms-version` added to requests that don't specify one.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Signs `request` as if the current time were `now`.
    ///
    /// Signing the same request twice with the same `now` produces the same
    /// `Authorization` header.
    pub fn sign_at(&self, request: &mut Request, now: SystemTime) -> Result<(), SigningError> {
        if request.uri().authority().is_none() {
            return Err(SigningError::InvalidRequest(format!(
                "URI `{}` has no host",
                request.uri()
            )));
        }

        let headers = request.headers_mut();
        headers.insert(MS_DATE, header_value(&rfc1123(now))?);
        if !headers.contains_key(MS_VERSION) {
            headers.insert(MS_VERSION, header_value(&self.api_version)?);
        }

        let string_to_sign = self.string_to_sign(request)?;
        let signature = self.signature(&string_to_sign)?;
        let authorization = format!("SharedKey {}:{}", self.account_name, signature);
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }

    fn string_to_sign(&self, request: &Request) -> Result<String, SigningError> {
        let mut out = String::with_capacity(256);
        out.push_str(request.method().as_str());
        out.push('\n');

        for name in STANDARD_HEADERS {
            let value = if name == "content-length" {
                content_length(request)?
            } else {
                header_str(request, name)?.unwrap_or_default().to_string()
            };
            out.push_str(&value);
            out.push('\n');
        }

        out.push_str(&canonicalized_headers(request)?);
        out.push_str(&self.canonicalized_resource(request));
        Ok(out)
    }

    fn canonicalized_resource(&self, request: &Request) -> String {
        let path = match request.uri().path() {
            "" => "/",
            path => path,
        };
        let mut out = format!("/{}{}", self.account_name, path);

        if let Some(query) = request.uri().query() {
            let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(name.to_lowercase())
                    .or_default()
                    .push(value.into_owned());
            }
            for (name, mut values) in params {
                values.sort();
                out.push('\n');
                out.push_str(&name);
                out.push(':');
                out.push_str(&values.join(","));
            }
        }
        out
    }

    fn signature(&self, string_to_sign: &str) -> Result<String, SigningError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl Signer for SharedKeySigner {
    fn sign(&self, request: &mut Request) -> Result<(), SigningError> {
        self.sign_at(request, SystemTime::now())
    }
}

impl fmt::Debug for SharedKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeySigner")
            .field("account_name", &self.account_name)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Formats `time` as an RFC 1123 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn rfc1123(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn header_value(value: &str) -> Result<HeaderValue, SigningError> {
    HeaderValue::from_str(value)
        .map_err(|_| SigningError::InvalidRequest(format!("`{value}` is not a valid header value")))
}

fn header_str<'r>(request: &'r Request, name: &str) -> Result<Option<&'r str>, SigningError> {
    request
        .headers()
        .get(name)
        .map(|value| {
            value.to_str().map_err(|_| {
                SigningError::InvalidRequest(format!("header `{name}` is not visible ASCII"))
            })
        })
        .transpose()
}

fn content_length(request: &Request) -> Result<String, SigningError> {
    let length = match header_str(request, "content-length")? {
        Some(value) => value.trim().to_string(),
        None => request.content_length().to_string(),
    };
    Ok(if length == "0" { String::new() } else { length })
}

fn canonicalized_headers(request: &Request) -> Result<String, SigningError> {
    let mut ms_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in request.headers() {
        if !name.as_str().starts_with("x-ms-") {
            continue;
        }
        let value = value.to_str().map_err(|_| {
            SigningError::InvalidRequest(format!("header `{name}` is not visible ASCII"))
        })?;
        ms_headers.entry(name.as_str()).or_default().push(value.trim());
    }

    let mut out = String::new();
    for (name, values) in ms_headers {
        out.push_str(name);
        out.push(':');
        out.push_str(&values.join(","));
        out.push('\n');
    }
    Ok(out)
}
