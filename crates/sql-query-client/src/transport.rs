//! HTTP transport: reqwest client, retry middleware and gzip handling.

use crate::config::ClientConfig;
use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use std::io::Write;
use std::time::Duration;

/// Retry settings in effect for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

/// The pair of middleware clients used for requests.
///
/// Idempotent requests go through `idempotent`, which retries transient
/// failures. Everything else goes through `non_idempotent`, which only
/// retries failures where the request never reached the server.
#[derive(Clone)]
pub(crate) struct Transport {
    base: reqwest::Client,
    idempotent: ClientWithMiddleware,
    non_idempotent: ClientWithMiddleware,
    retry: Option<RetrySettings>,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("sql-query-rust-sdk")),
        );

        // gzip(true) only controls response decompression and Accept-Encoding;
        // request bodies are compressed per call by `gzip_body`.
        let base = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        let retry = config.enable_retries.then(|| RetrySettings {
            max_retries: config.max_retries,
            initial_delay: config.retry_initial_delay.min(config.retry_max_delay),
            max_delay: config.retry_max_delay,
        });

        Ok(Self::with_retry(base, retry))
    }

    fn with_retry(base: reqwest::Client, retry: Option<RetrySettings>) -> Self {
        let (idempotent, non_idempotent) = match retry {
            Some(settings) => {
                let policy = || {
                    ExponentialBackoff::builder()
                        .retry_bounds(settings.initial_delay, settings.max_delay)
                        .build_with_max_retries(settings.max_retries)
                };
                (
                    ClientBuilder::new(base.clone())
                        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                            policy(),
                            SqlQueryRetryStrategy { idempotent: true },
                        ))
                        .build(),
                    ClientBuilder::new(base.clone())
                        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                            policy(),
                            SqlQueryRetryStrategy { idempotent: false },
                        ))
                        .build(),
                )
            }
            None => (
                ClientBuilder::new(base.clone()).build(),
                ClientBuilder::new(base.clone()).build(),
            ),
        };

        Self {
            base,
            idempotent,
            non_idempotent,
            retry,
        }
    }

    /// Replace the retry settings, keeping the connection pool.
    pub fn set_retry(&mut self, retry: Option<RetrySettings>) {
        *self = Self::with_retry(self.base.clone(), retry);
    }

    pub fn retry(&self) -> Option<RetrySettings> {
        self.retry
    }

    pub fn client(&self, idempotent: bool) -> &ClientWithMiddleware {
        if idempotent {
            &self.idempotent
        } else {
            &self.non_idempotent
        }
    }
}

/// Compress a request body with gzip.
pub(crate) fn gzip_body(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

/// Retry strategy for the SQL Query service.
///
/// Retries on:
/// - Connection failures (all requests)
/// - Timeouts, 429 and 5xx other than 501 (idempotent requests only)
///
/// Does NOT retry:
/// - Other 4xx client errors
/// - Anything that may have reached the server for a non-idempotent request
struct SqlQueryRetryStrategy {
    idempotent: bool,
}

impl RetryableStrategy for SqlQueryRetryStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<reqwest::Response>) -> Option<Retryable> {
        match res {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    None
                } else if self.idempotent && is_retryable_status(status) {
                    Some(Retryable::Transient)
                } else {
                    Some(Retryable::Fatal)
                }
            }
            Err(error) => {
                if error.is_connect() || (self.idempotent && error.is_timeout()) {
                    Some(Retryable::Transient)
                } else {
                    Some(Retryable::Fatal)
                }
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_gzip_body_round_trips() {
        let body = br#"{"statement":"SELECT 1"}"#;
        let compressed = gzip_body(body).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_set_retry_toggles() {
        let config = ClientConfig::builder("crn")
            .authenticator(crate::auth::NoAuthAuthenticator)
            .build()
            .unwrap();
        let mut transport = Transport::new(&config).unwrap();
        assert!(transport.retry().is_none());

        let settings = RetrySettings {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        transport.set_retry(Some(settings));
        assert_eq!(transport.retry(), Some(settings));

        transport.set_retry(None);
        assert!(transport.retry().is_none());
    }
}
