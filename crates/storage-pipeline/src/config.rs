//! Account settings: credentials and endpoints.
//!
//! A [`ServiceConfig`] is built directly, parsed from a storage connection
//! string, or read from the environment:
//!
//! | variable | setting |
//! |---|---|
//! | `AZURE_STORAGE_CONNECTION_STRING` | a full connection string (takes precedence) |
//! | `AZURE_STORAGE_ACCOUNT` | account name |
//! | `AZURE_STORAGE_ACCESS_KEY` | base64 account key |
//! | `AZURE_STORAGE_SAS_TOKEN` | shared access signature |

use http::Uri;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use storage_pipeline_auth::{SasSigner, SharedKeySigner, Signer, DEFAULT_API_VERSION};
use storage_pipeline_core::PipelineError;

pub const ENV_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const ENV_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const ENV_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";
pub const ENV_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";

/// Account name of the local storage emulator.
pub const DEVELOPMENT_ACCOUNT: &str = "devstoreaccount1";
/// Well-known key of the local storage emulator.
pub const DEVELOPMENT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// A storage service type, used to derive its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Blob,
    Queue,
    Table,
    File,
}

impl StorageKind {
    fn host_label(self) -> &'static str {
        match self {
            StorageKind::Blob => "blob",
            StorageKind::Queue => "queue",
            StorageKind::Table => "table",
            StorageKind::File => "file",
        }
    }

    /// Emulator port for this service.
    fn development_port(self) -> u16 {
        match self {
            StorageKind::Blob => 10000,
            StorageKind::Queue => 10001,
            StorageKind::Table => 10002,
            StorageKind::File => 10003,
        }
    }

    fn connection_string_key(self) -> &'static str {
        match self {
            StorageKind::Blob => "Blob",
            StorageKind::Queue => "Queue",
            StorageKind::Table => "Table",
            StorageKind::File => "File",
        }
    }

    const ALL: [StorageKind; 4] = [
        StorageKind::Blob,
        StorageKind::Queue,
        StorageKind::Table,
        StorageKind::File,
    ];
}

/// Credentials and endpoints of a storage account.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    account_name: Option<String>,
    account_key: Option<String>,
    sas_token: Option<String>,
    protocol: String,
    endpoint_suffix: String,
    development_proxy: Option<String>,
    endpoints: HashMap<StorageKind, String>,
    secondary_endpoints: HashMap<StorageKind, String>,
    api_version: String,
    user_agent_prefix: Option<String>,
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// Settings for the local storage emulator.
    ///
    /// `proxy_uri` replaces `http://127.0.0.1` when the emulator runs elsewhere.
    pub fn development(proxy_uri: Option<&str>) -> Self {
        let mut builder = ServiceConfigBuilder::new()
            .account_name(DEVELOPMENT_ACCOUNT)
            .account_key(DEVELOPMENT_KEY)
            .protocol("http");
        builder.development_proxy = Some(
            proxy_uri
                .unwrap_or("http://127.0.0.1")
                .trim_end_matches('/')
                .to_string(),
        );
        builder.build_unchecked()
    }

    /// Parses a connection string such as
    /// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
    ///
    /// Also understood: `SharedAccessSignature`, `UseDevelopmentStorage`,
    /// `DevelopmentStorageProxyUri`, and per-service `{Blob,Queue,Table,File}Endpoint`
    /// / `...SecondaryEndpoint`. Keys are case-insensitive.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, PipelineError> {
        let mut settings: HashMap<String, String> = HashMap::new();
        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                PipelineError::Config(format!(
                    "connection string segment `{segment}` is not a key=value pair"
                ))
            })?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        let mut take = |key: &str| settings.remove(&key.to_ascii_lowercase());

        if take("UseDevelopmentStorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            let proxy = take("DevelopmentStorageProxyUri");
            return Ok(Self::development(proxy.as_deref()));
        }

        let mut builder = ServiceConfigBuilder::new();
        if let Some(protocol) = take("DefaultEndpointsProtocol") {
            builder = builder.protocol(protocol);
        }
        if let Some(account) = take("AccountName") {
            builder = builder.account_name(account);
        }
        if let Some(key) = take("AccountKey") {
            builder = builder.account_key(key);
        }
        if let Some(sas) = take("SharedAccessSignature") {
            builder = builder.sas_token(sas);
        }
        if let Some(suffix) = take("EndpointSuffix") {
            builder = builder.endpoint_suffix(suffix);
        }
        for kind in StorageKind::ALL {
            let name = kind.connection_string_key();
            if let Some(endpoint) = take(&format!("{name}Endpoint")) {
                builder = builder.endpoint(kind, endpoint);
            }
            if let Some(endpoint) = take(&format!("{name}SecondaryEndpoint")) {
                builder = builder.secondary_endpoint(kind, endpoint);
            }
        }
        builder.build()
    }

    /// Reads settings from `AZURE_STORAGE_*` environment variables.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(connection_string) = get(ENV_CONNECTION_STRING) {
            return Self::from_connection_string(&connection_string);
        }

        let mut builder = ServiceConfigBuilder::new();
        if let Some(account) = get(ENV_ACCOUNT) {
            builder = builder.account_name(account);
        }
        if let Some(key) = get(ENV_ACCESS_KEY) {
            builder = builder.account_key(key);
        }
        if let Some(sas) = get(ENV_SAS_TOKEN) {
            builder = builder.sas_token(sas);
        }
        builder.build()
    }

    pub fn account_name(&self) -> Option<&str> {
        self.account_name.as_deref()
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    pub fn has_credentials(&self) -> bool {
        self.account_key.is_some() || self.sas_token.is_some()
    }

    /// The primary endpoint of `kind`.
    ///
    /// An explicitly configured endpoint wins; otherwise it is derived as
    /// `{protocol}://{account}.{kind}.{suffix}`, or as
    /// `{proxy}:{port}/{account}` for the emulator.
    pub fn endpoint(&self, kind: StorageKind) -> Result<Uri, PipelineError> {
        if let Some(endpoint) = self.endpoints.get(&kind) {
            return parse_endpoint(endpoint, &self.protocol);
        }
        let account = self.require_account()?;
        if let Some(proxy) = &self.development_proxy {
            return parse_endpoint(
                &format!("{proxy}:{}/{account}", kind.development_port()),
                &self.protocol,
            );
        }
        parse_endpoint(
            &format!(
                "{}://{account}.{}.{}",
                self.protocol,
                kind.host_label(),
                self.endpoint_suffix
            ),
            &self.protocol,
        )
    }

    /// The read-access secondary endpoint of `kind`, if the account has one.
    ///
    /// Explicit secondary endpoints win; otherwise it is derived as
    /// `{protocol}://{account}-secondary.{kind}.{suffix}` for accounts
    /// using derived primary endpoints. The emulator has none.
    pub fn secondary_endpoint(&self, kind: StorageKind) -> Result<Option<Uri>, PipelineError> {
        if let Some(endpoint) = self.secondary_endpoints.get(&kind) {
            return parse_endpoint(endpoint, &self.protocol).map(Some);
        }
        if self.development_proxy.is_some() || self.endpoints.contains_key(&kind) {
            return Ok(None);
        }
        let account = self.require_account()?;
        parse_endpoint(
            &format!(
                "{}://{account}-secondary.{}.{}",
                self.protocol,
                kind.host_label(),
                self.endpoint_suffix
            ),
            &self.protocol,
        )
        .map(Some)
    }

    /// Builds the signer for these credentials.
    ///
    /// An account key selects Shared Key signing, otherwise a SAS token
    /// selects SAS signing. Without either this is an error: unauthenticated
    /// access has to be requested with
    /// [`SignedServiceBuilder::anonymous`](crate::SignedServiceBuilder::anonymous).
    pub fn signer(&self) -> Result<Arc<dyn Signer>, PipelineError> {
        if let Some(key) = &self.account_key {
            let account = self.require_account()?;
            let signer =
                SharedKeySigner::new(account, key)?.with_api_version(self.api_version.clone());
            return Ok(Arc::new(signer));
        }
        if let Some(token) = &self.sas_token {
            return Ok(Arc::new(SasSigner::new(token)?));
        }
        Err(PipelineError::Config(
            "no account key or SAS token configured".to_string(),
        ))
    }

    fn require_account(&self) -> Result<&str, PipelineError> {
        self.account_name
            .as_deref()
            .ok_or_else(|| PipelineError::Config("storage account name is missing".to_string()))
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .field("protocol", &self.protocol)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("endpoints", &self.endpoints)
            .field("secondary_endpoints", &self.secondary_endpoints)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ServiceConfigBuilder {
    account_name: Option<String>,
    account_key: Option<String>,
    sas_token: Option<String>,
    protocol: String,
    endpoint_suffix: String,
    development_proxy: Option<String>,
    endpoints: HashMap<StorageKind, String>,
    secondary_endpoints: HashMap<StorageKind, String>,
    api_version: String,
    user_agent_prefix: Option<String>,
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - protocol: `https`
    /// - endpoint_suffix: `core.windows.net`
    /// - api_version: [`DEFAULT_API_VERSION`]
    pub fn new() -> Self {
        Self {
            account_name: None,
            account_key: None,
            sas_token: None,
            protocol: "https".to_string(),
            endpoint_suffix: DEFAULT_ENDPOINT_SUFFIX.to_string(),
            development_proxy: None,
            endpoints: HashMap::new(),
            secondary_endpoints: HashMap::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent_prefix: None,
        }
    }

    pub fn account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    /// Sets the base64-encoded account key.
    pub fn account_key(mut self, account_key: impl Into<String>) -> Self {
        self.account_key = Some(account_key.into());
        self
    }

    pub fn sas_token(mut self, sas_token: impl Into<String>) -> Self {
        self.sas_token = Some(sas_token.into());
        self
    }

    /// Scheme for derived endpoints and for explicit endpoints given without one.
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn endpoint_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.endpoint_suffix = suffix.into();
        self
    }

    /// Overrides the primary endpoint (URI or bare host) of one service.
    pub fn endpoint(mut self, kind: StorageKind, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(kind, endpoint.into());
        self
    }

    pub fn secondary_endpoint(mut self, kind: StorageKind, endpoint: impl Into<String>) -> Self {
        self.secondary_endpoints.insert(kind, endpoint.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Validates and builds the configuration.
    ///
    /// Fails when the protocol is neither `http` nor `https`, when a key is
    /// given without an account name, or when no account name or endpoint
    /// is given at all.
    pub fn build(self) -> Result<ServiceConfig, PipelineError> {
        if !matches!(self.protocol.as_str(), "http" | "https") {
            return Err(PipelineError::Config(format!(
                "unsupported protocol `{}`",
                self.protocol
            )));
        }
        if self.account_key.is_some() && self.account_name.is_none() {
            return Err(PipelineError::Config(
                "an account key requires an account name".to_string(),
            ));
        }
        if self.account_name.is_none() && self.endpoints.is_empty() {
            return Err(PipelineError::Config(
                "either an account name or a service endpoint is required".to_string(),
            ));
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> ServiceConfig {
        ServiceConfig {
            account_name: self.account_name,
            account_key: self.account_key,
            sas_token: self.sas_token,
            protocol: self.protocol,
            endpoint_suffix: self.endpoint_suffix,
            development_proxy: self.development_proxy,
            endpoints: self.endpoints,
            secondary_endpoints: self.secondary_endpoints,
            api_version: self.api_version,
            user_agent_prefix: self.user_agent_prefix,
        }
    }
}

fn parse_endpoint(endpoint: &str, protocol: &str) -> Result<Uri, PipelineError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let endpoint = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("{protocol}://{endpoint}")
    };
    endpoint
        .parse::<Uri>()
        .map_err(|e| PipelineError::Config(format!("invalid endpoint `{endpoint}`: {e}")))
}
