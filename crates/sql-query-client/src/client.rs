//! The SQL Query service client.

use crate::auth::Authenticator;
use crate::config::{
    validate_service_url, ClientConfig, ClientConfigBuilder, ExternalConfig,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_MAX_INTERVAL,
};
use crate::context::RequestContext;
use crate::error::{ClientError, Result};
use crate::options::{
    GetSqlJobOptions, GetTableOptions, ListSqlJobsOptions, ListTablesOptions,
    SubmitSqlJobOptions, Validate,
};
use crate::response::{DetailedResponse, RawResponse};
use crate::sdk_headers::sdk_headers;
use crate::transport::{gzip_body, RetrySettings, Transport};
use crate::types::{
    ApiError, SqlJobInfoFull, SqlJobInfoList, SqlJobInfoShort, SubmitSqlJobBody,
    TableInformation, TableList,
};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_ENCODING, CONTENT_TYPE,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const APPLICATION_JSON: &str = "application/json";

/// Client for the SQL Query service.
///
/// Every call is scoped to the configured instance CRN. Cloning yields an
/// independent client (its own URL, headers, gzip and retry settings) that
/// shares the authenticator and connection pool with the original. Setters
/// take `&mut self`; share a client across tasks with `Arc` or give each
/// task its own clone.
#[derive(Clone)]
pub struct SqlQueryClient {
    transport: Transport,
    config: ClientConfig,
    authenticator: Arc<dyn Authenticator>,
    instance_crn: String,
}

/// A fully resolved operation, ready to send.
struct OperationRequest<'a> {
    operation_id: &'static str,
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    headers: &'a BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl SqlQueryClient {
    /// Create a new configuration builder for the given instance.
    pub fn builder(instance_crn: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(instance_crn)
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let authenticator = config
            .authenticator
            .clone()
            .ok_or_else(|| ClientError::Config("authenticator is required".to_string()))?;
        let instance_crn = config
            .instance_crn
            .clone()
            .ok_or_else(|| ClientError::Config("instance_crn is required".to_string()))?;
        let transport = Transport::new(&config)?;

        tracing::debug!(
            service_url = %config.service_url,
            auth = authenticator.authentication_type(),
            retries = config.enable_retries,
            "Created SQL Query client"
        );

        Ok(Self {
            transport,
            config,
            authenticator,
            instance_crn,
        })
    }

    /// Create a client from external configuration (see [`ExternalConfig`]).
    pub fn from_external_config(
        external: &ExternalConfig,
        instance_crn: impl Into<String>,
    ) -> Result<Self> {
        Self::new(ClientConfigBuilder::from_external(external, instance_crn)?.build()?)
    }

    /// The service does not publish regional URLs.
    pub fn service_url_for_region(region: &str) -> Result<String> {
        Err(ClientError::Config(format!(
            "service does not support regional URLs (requested '{}')",
            region
        )))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Get the service URL.
    pub fn service_url(&self) -> &str {
        &self.config.service_url
    }

    /// Set the service URL. An empty URL is accepted, but operations fail
    /// until a real one is set.
    pub fn set_service_url(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        validate_service_url(&url)?;
        self.config.service_url = url;
        Ok(())
    }

    pub fn instance_crn(&self) -> &str {
        &self.instance_crn
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Replace the headers sent with every request.
    pub fn set_default_headers(&mut self, headers: HeaderMap) {
        self.config.default_headers = headers;
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.config.default_headers
    }

    pub fn set_enable_gzip_compression(&mut self, enable: bool) {
        self.config.enable_gzip = enable;
    }

    pub fn enable_gzip_compression(&self) -> bool {
        self.config.enable_gzip
    }

    /// Enable automatic retries. Zero values select the library defaults
    /// (4 retries, 30 second interval cap).
    pub fn enable_retries(&mut self, max_retries: u32, max_retry_interval: Duration) {
        let max_retries = if max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            max_retries
        };
        let max_delay = if max_retry_interval.is_zero() {
            DEFAULT_RETRY_MAX_INTERVAL
        } else {
            max_retry_interval
        };

        self.config.enable_retries = true;
        self.config.max_retries = max_retries;
        self.config.retry_max_delay = max_delay;
        self.transport.set_retry(Some(RetrySettings {
            max_retries,
            initial_delay: self.config.retry_initial_delay.min(max_delay),
            max_delay,
        }));
    }

    /// Disable automatic retries.
    pub fn disable_retries(&mut self) {
        self.config.enable_retries = false;
        self.transport.set_retry(None);
    }

    /// Retry settings currently in effect, if retries are enabled.
    pub fn retry_settings(&self) -> Option<RetrySettings> {
        self.transport.retry()
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// List catalog tables (the service returns at most the first 100).
    pub async fn list_tables(
        &self,
        options: &ListTablesOptions,
    ) -> Result<DetailedResponse<TableList>> {
        self.list_tables_with_context(&RequestContext::default(), options)
            .await
    }

    pub async fn list_tables_with_context(
        &self,
        ctx: &RequestContext,
        options: &ListTablesOptions,
    ) -> Result<DetailedResponse<TableList>> {
        options.validate()?;

        let mut query = self.base_query();
        if let Some(pattern) = &options.name_pattern {
            query.push(("name_pattern", pattern.clone()));
        }
        if let Some(table_type) = &options.table_type {
            query.push(("type", table_type.to_string()));
        }

        self.execute(
            ctx,
            OperationRequest {
                operation_id: "ListTables",
                method: Method::GET,
                path: "/tables".to_string(),
                query,
                headers: &options.headers,
                body: None,
            },
        )
        .await
    }

    /// Get information about one catalog table.
    pub async fn get_table(
        &self,
        options: &GetTableOptions,
    ) -> Result<DetailedResponse<TableInformation>> {
        self.get_table_with_context(&RequestContext::default(), options)
            .await
    }

    pub async fn get_table_with_context(
        &self,
        ctx: &RequestContext,
        options: &GetTableOptions,
    ) -> Result<DetailedResponse<TableInformation>> {
        options.validate()?;
        let table_name = options.table_name.as_deref().unwrap_or_default();

        self.execute(
            ctx,
            OperationRequest {
                operation_id: "GetTable",
                method: Method::GET,
                path: format!("/tables/{}", urlencoding::encode(table_name)),
                query: self.base_query(),
                headers: &options.headers,
                body: None,
            },
        )
        .await
    }

    // =========================================================================
    // SQL Job Operations
    // =========================================================================

    /// Submit an SQL job. The job runs asynchronously on the service; poll
    /// it with [`get_sql_job`](Self::get_sql_job).
    pub async fn submit_sql_job(
        &self,
        options: &SubmitSqlJobOptions,
    ) -> Result<DetailedResponse<SqlJobInfoShort>> {
        self.submit_sql_job_with_context(&RequestContext::default(), options)
            .await
    }

    pub async fn submit_sql_job_with_context(
        &self,
        ctx: &RequestContext,
        options: &SubmitSqlJobOptions,
    ) -> Result<DetailedResponse<SqlJobInfoShort>> {
        options.validate()?;

        let body = serde_json::to_vec(&SubmitSqlJobBody {
            statement: options.statement.as_deref(),
            resultset_target: options.resultset_target.as_deref(),
        })?;

        self.execute(
            ctx,
            OperationRequest {
                operation_id: "SubmitSqlJob",
                method: Method::POST,
                path: "/sql_jobs".to_string(),
                query: self.base_query(),
                headers: &options.headers,
                body: Some(body),
            },
        )
        .await
    }

    /// List recently submitted SQL jobs.
    pub async fn list_sql_jobs(
        &self,
        options: &ListSqlJobsOptions,
    ) -> Result<DetailedResponse<SqlJobInfoList>> {
        self.list_sql_jobs_with_context(&RequestContext::default(), options)
            .await
    }

    pub async fn list_sql_jobs_with_context(
        &self,
        ctx: &RequestContext,
        options: &ListSqlJobsOptions,
    ) -> Result<DetailedResponse<SqlJobInfoList>> {
        options.validate()?;

        self.execute(
            ctx,
            OperationRequest {
                operation_id: "ListSqlJobs",
                method: Method::GET,
                path: "/sql_jobs".to_string(),
                query: self.base_query(),
                headers: &options.headers,
                body: None,
            },
        )
        .await
    }

    /// Get full information about one SQL job.
    pub async fn get_sql_job(
        &self,
        options: &GetSqlJobOptions,
    ) -> Result<DetailedResponse<SqlJobInfoFull>> {
        self.get_sql_job_with_context(&RequestContext::default(), options)
            .await
    }

    pub async fn get_sql_job_with_context(
        &self,
        ctx: &RequestContext,
        options: &GetSqlJobOptions,
    ) -> Result<DetailedResponse<SqlJobInfoFull>> {
        options.validate()?;
        let job_id = options.job_id.as_deref().unwrap_or_default();

        self.execute(
            ctx,
            OperationRequest {
                operation_id: "GetSqlJob",
                method: Method::GET,
                path: format!("/sql_jobs/{}", urlencoding::encode(job_id)),
                query: self.base_query(),
                headers: &options.headers,
                body: None,
            },
        )
        .await
    }

    /// Poll a job until it completes or fails.
    ///
    /// Bound the wait with a context deadline; without one this polls
    /// until the service reports a terminal status.
    pub async fn wait_for_sql_job(
        &self,
        ctx: &RequestContext,
        job_id: &str,
        poll_interval: Duration,
    ) -> Result<DetailedResponse<SqlJobInfoFull>> {
        let options = GetSqlJobOptions::new(job_id);
        loop {
            let response = self.get_sql_job_with_context(ctx, &options).await?;
            if response.result.status.is_terminal() {
                return Ok(response);
            }
            tracing::debug!(
                job_id = %job_id,
                status = %response.result.status,
                "Job not finished, polling again"
            );
            ctx.run(async {
                tokio::time::sleep(poll_interval).await;
                Ok(())
            })
            .await?;
        }
    }

    // =========================================================================
    // Internal HTTP Methods
    // =========================================================================

    fn base_query(&self) -> Vec<(&'static str, String)> {
        vec![("instance_crn", self.instance_crn.clone())]
    }

    fn resolve_url(&self, path: &str) -> Result<String> {
        if self.config.service_url.is_empty() {
            return Err(ClientError::Config("service URL is missing".to_string()));
        }
        Ok(format!(
            "{}{}",
            self.config.service_url.trim_end_matches('/'),
            path
        ))
    }

    /// Default headers, then per-call headers, then SDK headers, then auth.
    fn build_headers(&self, op: &OperationRequest<'_>) -> Result<HeaderMap> {
        let mut headers = self.config.default_headers.clone();

        for (name, value) in op.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::Validation(format!("invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ClientError::Validation(format!("invalid value for header {}", name))
            })?;
            headers.insert(name, value);
        }

        headers.extend(sdk_headers(op.operation_id));
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        if op.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }

        self.authenticator.authenticate(&mut headers)?;
        Ok(headers)
    }

    /// Send an operation and decode the response.
    async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        op: OperationRequest<'_>,
    ) -> Result<DetailedResponse<T>> {
        let url = self.resolve_url(&op.path)?;
        let mut headers = self.build_headers(&op)?;

        let body = match op.body {
            Some(body) if self.config.enable_gzip => {
                headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                Some(gzip_body(&body).map_err(|e| {
                    ClientError::Config(format!("failed to compress request body: {}", e))
                })?)
            }
            other => other,
        };

        let idempotent = op.method != Method::POST;
        let mut request = self
            .transport
            .client(idempotent)
            .request(op.method.clone(), &url)
            .headers(headers)
            .query(&op.query);
        if let Some(body) = body {
            request = request.body(body);
        }

        let method = op.method;
        let operation_id = op.operation_id;
        let path = op.path;

        ctx.run(async move {
            let start = std::time::Instant::now();

            tracing::debug!(
                operation = operation_id,
                method = %method,
                path = %path,
                "Sending request"
            );

            let response = request.send().await?;
            let status = response.status();
            let response_headers = response.headers().clone();
            let bytes = response.bytes().await?;
            let duration = start.elapsed();

            let raw = RawResponse {
                status_code: status.as_u16(),
                headers: response_headers,
                body: bytes.to_vec(),
            };

            tracing::debug!(
                operation = operation_id,
                method = %method,
                path = %path,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                request_id = ?raw.request_id(),
                "Received response"
            );

            if status.is_success() {
                Self::decode(raw)
            } else {
                let error = Self::status_to_error(status, raw);
                tracing::warn!(
                    operation = operation_id,
                    method = %method,
                    path = %path,
                    status = %status.as_u16(),
                    duration_ms = %duration.as_millis(),
                    error = %error,
                    "Request failed"
                );
                Err(error)
            }
        })
        .await
    }

    /// Decode a success response. Empty and malformed bodies are errors.
    fn decode<T: DeserializeOwned>(raw: RawResponse) -> Result<DetailedResponse<T>> {
        if raw.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ClientError::Decode {
                message: "empty response body".to_string(),
                response: Box::new(raw),
            });
        }

        match serde_json::from_slice::<T>(&raw.body) {
            Ok(result) => Ok(DetailedResponse {
                status_code: raw.status_code,
                headers: raw.headers,
                result,
            }),
            Err(e) => Err(ClientError::Decode {
                message: format!(
                    "Failed to parse response: {} (body: {})",
                    e,
                    raw.body_text()
                ),
                response: Box::new(raw),
            }),
        }
    }

    /// Convert HTTP status to appropriate error type.
    fn status_to_error(status: StatusCode, raw: RawResponse) -> ClientError {
        let api_error: Option<ApiError> = serde_json::from_slice(&raw.body).ok();

        let message = api_error
            .as_ref()
            .and_then(ApiError::message)
            .unwrap_or_else(|| {
                if raw.body.is_empty() {
                    status.to_string()
                } else {
                    raw.body_text()
                }
            });

        let request_id = api_error
            .and_then(|e| e.request_id)
            .or_else(|| raw.request_id().map(String::from));

        let response = Box::new(raw);
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound { message, response },
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized { message, response },
            StatusCode::FORBIDDEN => ClientError::Forbidden { message, response },
            StatusCode::CONFLICT => ClientError::Conflict { message, response },
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
                retry_after: Self::parse_retry_after(&response.headers),
                request_id,
                response,
            },
            _ if status.is_client_error() => ClientError::Rejected {
                status: status.as_u16(),
                message,
                request_id,
                response,
            },
            _ => ClientError::ServerError {
                status: status.as_u16(),
                message,
                request_id,
                response,
            },
        }
    }

    /// Parse the Retry-After header value into a Duration.
    ///
    /// Supports both formats per RFC 7231:
    /// - Seconds: "120" -> Duration::from_secs(120)
    /// - HTTP-date: "Fri, 31 Dec 2024 23:59:59 GMT" -> Duration until that time
    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let header_value = headers.get("retry-after")?.to_str().ok()?;

        if let Ok(seconds) = header_value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        if let Ok(date) = httpdate::parse_http_date(header_value) {
            let now = std::time::SystemTime::now();
            // A date in the past means "now"
            return Some(date.duration_since(now).unwrap_or(Duration::ZERO));
        }

        None
    }
}

/// Arc-wrapped client for shared ownership.
pub type SharedClient = Arc<SqlQueryClient>;
