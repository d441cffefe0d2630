//! Client configuration and builder pattern.

use crate::auth::{
    Authenticator, BasicAuthenticator, BearerTokenAuthenticator, NoAuthAuthenticator,
    AUTHTYPE_BASIC, AUTHTYPE_BEARER_TOKEN, AUTHTYPE_NOAUTH,
};
use crate::error::{ClientError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default URL of the SQL Query service.
pub const DEFAULT_SERVICE_URL: &str = "https://api.sql-query.cloud.ibm.com/v2";

/// Default key used to find external configuration.
pub const DEFAULT_SERVICE_NAME: &str = "sql";

/// Retry count used when retries are enabled with `max_retries == 0`.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Retry interval cap used when retries are enabled with a zero interval.
pub const DEFAULT_RETRY_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the SQL Query client.
///
/// # Security
///
/// The authenticator's own `Debug` implementation masks its secrets, so the
/// configuration can be logged safely.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the service (default: [`DEFAULT_SERVICE_URL`])
    pub service_url: String,
    /// CRN of the SQL Query instance; sent as `instance_crn` on every call
    pub instance_crn: Option<String>,
    /// Request authenticator, shared by all clones of the client
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Per-attempt request timeout (default: 60 seconds)
    pub timeout: Duration,
    /// Gzip request bodies and ask for gzip responses (default: false)
    pub enable_gzip: bool,
    /// Whether transient failures are retried (default: false)
    pub enable_retries: bool,
    /// Maximum number of retries when enabled (default: 4)
    pub max_retries: u32,
    /// Initial retry delay for exponential backoff (default: 1 second)
    pub retry_initial_delay: Duration,
    /// Maximum retry delay (default: 30 seconds)
    pub retry_max_delay: Duration,
    /// Headers sent with every request
    pub default_headers: HeaderMap,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            instance_crn: None,
            authenticator: None,
            timeout: Duration::from_secs(60),
            enable_gzip: false,
            enable_retries: false,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_initial_delay: Duration::from_secs(1),
            retry_max_delay: DEFAULT_RETRY_MAX_INTERVAL,
            default_headers: HeaderMap::new(),
            tls_verify: true,
            user_agent: crate::sdk_headers::user_agent(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_url", &self.service_url)
            .field("instance_crn", &self.instance_crn)
            .field("authenticator", &self.authenticator)
            .field("timeout", &self.timeout)
            .field("enable_gzip", &self.enable_gzip)
            .field("enable_retries", &self.enable_retries)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay", &self.retry_initial_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("default_headers", &self.default_headers)
            .field("tls_verify", &self.tls_verify)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder for the given instance.
    pub fn builder(instance_crn: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(instance_crn)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match self.instance_crn.as_deref() {
            Some(crn) if !crn.is_empty() => {}
            _ => {
                return Err(ClientError::Config(
                    "instance_crn is required".to_string(),
                ))
            }
        }

        validate_service_url(&self.service_url)?;

        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or_else(|| ClientError::Config("authenticator is required".to_string()))?;
        authenticator.validate()?;

        // Validate retry delay bounds
        if self.retry_initial_delay > self.retry_max_delay {
            return Err(ClientError::Config(format!(
                "retry_initial_delay ({:?}) must be <= retry_max_delay ({:?})",
                self.retry_initial_delay, self.retry_max_delay
            )));
        }

        // Validate minimum timeout
        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Check a service URL. An empty URL is accepted here and rejected when an
/// operation is invoked.
pub(crate) fn validate_service_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }
    let bad = |c: char| matches!(c, '{' | '}' | '"');
    if url.starts_with(bad) || url.ends_with(bad) {
        return Err(ClientError::InvalidUrl(format!(
            "service URL must not begin or end with '{{', '}}' or '\"': {url}"
        )));
    }
    url::Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(())
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder for the given instance CRN.
    pub fn new(instance_crn: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                instance_crn: Some(instance_crn.into()),
                ..Default::default()
            },
        }
    }

    /// Start from external configuration.
    ///
    /// Applies the URL, authenticator, gzip, TLS and retry settings found in
    /// `external`. Setters called afterwards take precedence.
    pub fn from_external(
        external: &ExternalConfig,
        instance_crn: impl Into<String>,
    ) -> Result<Self> {
        let mut builder = Self::new(instance_crn).authenticator_arc(external.authenticator()?);
        if let Some(url) = external.url() {
            builder = builder.service_url(url);
        }
        if let Some(gzip) = external.enable_gzip()? {
            builder = builder.enable_gzip(gzip);
        }
        if let Some(disable_ssl) = external.disable_ssl()? {
            builder = builder.tls_verify(!disable_ssl);
        }
        if external.enable_retries()?.unwrap_or(false) {
            builder = builder.retries(
                external.max_retries()?.unwrap_or(0),
                external.retry_interval()?.unwrap_or(Duration::ZERO),
            );
        }
        Ok(builder)
    }

    /// Override the service URL.
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_url = url.into();
        self
    }

    /// Set the request authenticator.
    pub fn authenticator(self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator_arc(Arc::new(authenticator))
    }

    /// Set an already shared request authenticator.
    pub fn authenticator_arc(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.config.authenticator = Some(authenticator);
        self
    }

    /// Set the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Enable or disable gzip compression.
    pub fn enable_gzip(mut self, enable: bool) -> Self {
        self.config.enable_gzip = enable;
        self
    }

    /// Enable retries. Zero values select the library defaults.
    pub fn retries(mut self, max_retries: u32, max_retry_interval: Duration) -> Self {
        self.config.enable_retries = true;
        self.config.max_retries = if max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            max_retries
        };
        self.config.retry_max_delay = if max_retry_interval.is_zero() {
            DEFAULT_RETRY_MAX_INTERVAL
        } else {
            max_retry_interval
        };
        self.config.retry_initial_delay = self
            .config
            .retry_initial_delay
            .min(self.config.retry_max_delay);
        self
    }

    /// Set the initial retry delay for exponential backoff.
    pub fn retry_initial_delay(mut self, delay: Duration) -> Self {
        self.config.retry_initial_delay = delay;
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config.default_headers.insert(name, value);
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.config.tls_verify = verify;
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Service settings read from environment-style key/value pairs.
///
/// Keys are prefixed with the upper-cased service name, e.g. `SQL_URL`,
/// `SQL_AUTH_TYPE`. The snapshot is taken once, typically at program
/// start-up, and handed to [`ClientConfigBuilder::from_external`]; the
/// client itself never reads the environment.
#[derive(Clone)]
pub struct ExternalConfig {
    service_name: String,
    vars: HashMap<String, String>,
}

impl fmt::Debug for ExternalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("ExternalConfig")
            .field("service_name", &self.service_name)
            .field("keys", &keys)
            .finish()
    }
}

impl ExternalConfig {
    /// Snapshot the process environment for `service_name`.
    pub fn from_env(service_name: &str) -> Self {
        Self::from_vars(service_name, std::env::vars())
    }

    /// Build from arbitrary key/value pairs. Keys not belonging to the
    /// service are ignored.
    pub fn from_vars<I, K, V>(service_name: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = format!("{}_", Self::prefix(service_name));
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|key| (key.to_string(), v)))
            .collect();
        Self {
            service_name: service_name.to_string(),
            vars,
        }
    }

    fn prefix(service_name: &str) -> String {
        service_name.to_ascii_uppercase().replace('-', "_")
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn key(&self, key: &str) -> String {
        format!("{}_{}", Self::prefix(&self.service_name), key)
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.parse::<bool>().map(Some).map_err(|_| {
                ClientError::Config(format!("{} must be true or false, got '{}'", self.key(key), v))
            }),
        }
    }

    fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
                ClientError::Config(format!("{} must be a number, got '{}'", self.key(key), v))
            }),
        }
    }

    /// `<S>_URL`
    pub fn url(&self) -> Option<&str> {
        self.get("URL")
    }

    /// `<S>_ENABLE_GZIP`
    pub fn enable_gzip(&self) -> Result<Option<bool>> {
        self.get_bool("ENABLE_GZIP")
    }

    /// `<S>_DISABLE_SSL`, turns off TLS certificate verification
    pub fn disable_ssl(&self) -> Result<Option<bool>> {
        self.get_bool("DISABLE_SSL")
    }

    /// `<S>_ENABLE_RETRIES`
    pub fn enable_retries(&self) -> Result<Option<bool>> {
        self.get_bool("ENABLE_RETRIES")
    }

    /// `<S>_MAX_RETRIES`
    pub fn max_retries(&self) -> Result<Option<u32>> {
        Ok(self.get_u64("MAX_RETRIES")?.map(|v| v.min(u32::MAX as u64) as u32))
    }

    /// `<S>_RETRY_INTERVAL`, in seconds
    pub fn retry_interval(&self) -> Result<Option<Duration>> {
        Ok(self.get_u64("RETRY_INTERVAL")?.map(Duration::from_secs))
    }

    /// Build the authenticator named by `<S>_AUTH_TYPE`.
    ///
    /// Supported types are `noauth`, `basic` (`<S>_USERNAME`,
    /// `<S>_PASSWORD`) and `bearertoken` (`<S>_BEARER_TOKEN`), matched
    /// case-insensitively. A missing auth type is an error.
    pub fn authenticator(&self) -> Result<Arc<dyn Authenticator>> {
        let auth_type = self.get("AUTH_TYPE").ok_or_else(|| {
            ClientError::Config(format!("{} is not set", self.key("AUTH_TYPE")))
        })?;

        let authenticator: Arc<dyn Authenticator> = match auth_type.to_ascii_lowercase().as_str()
        {
            AUTHTYPE_NOAUTH => Arc::new(NoAuthAuthenticator),
            AUTHTYPE_BASIC => Arc::new(BasicAuthenticator::new(
                self.get("USERNAME").unwrap_or_default(),
                self.get("PASSWORD").unwrap_or_default(),
            )),
            AUTHTYPE_BEARER_TOKEN => Arc::new(BearerTokenAuthenticator::new(
                self.get("BEARER_TOKEN").unwrap_or_default(),
            )),
            other => {
                return Err(ClientError::Config(format!(
                    "unsupported authentication type '{}' in {}",
                    other,
                    self.key("AUTH_TYPE")
                )))
            }
        };
        authenticator.validate()?;
        Ok(authenticator)
    }
}
