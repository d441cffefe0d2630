//! Error types for the SQL Query client SDK.

use crate::response::RawResponse;
use std::time::Duration;

/// Errors that can occur when using the SQL Query client.
///
/// Variants that originate from an HTTP exchange carry the [`RawResponse`]
/// so callers can inspect status, headers and body even when decoding
/// failed. Use [`ClientError::response`] to reach it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error raised inside the middleware stack (including exhausted retries)
    #[error("HTTP request error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// The request context deadline elapsed before a response was decoded
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The request context was cancelled by the caller
    #[error("context canceled")]
    Cancelled,

    /// The authenticator could not produce credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authentication failed (401)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message from server
        message: String,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Permission denied (403)
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message from server
        message: String,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Job or table not found (404)
    #[error("Not found: {message}")]
    NotFound {
        /// Error message from server
        message: String,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Conflict (409)
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message from server
        message: String,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Rate limited (429)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Optional retry-after duration from server
        retry_after: Option<Duration>,
        /// Request ID for tracking
        request_id: Option<String>,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Any other client-side rejection (400, 405, 413, ...)
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
        /// Request ID for tracking
        request_id: Option<String>,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Server-side failure (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
        /// Request ID for tracking
        request_id: Option<String>,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// A success response whose body is empty or does not match the model
    #[error("Invalid response: {message}")]
    Decode {
        /// Decoder message
        message: String,
        /// Raw response
        response: Box<RawResponse>,
    },

    /// Request options failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request body serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited { .. } => true,
            ClientError::ServerError { status, .. } => *status >= 500 && *status != 501,
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns true for deadline and cancellation errors.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::DeadlineExceeded | ClientError::Cancelled)
    }

    /// Returns the request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientError::RateLimited { request_id, .. } => request_id.as_deref(),
            ClientError::ServerError { request_id, .. }
            | ClientError::Rejected { request_id, .. } => request_id.as_deref(),
            _ => self.response().and_then(RawResponse::request_id),
        }
    }

    /// Returns the HTTP status code if the error came from a response.
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status_code)
    }

    /// Returns the raw response attached to this error, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            ClientError::Unauthorized { response, .. }
            | ClientError::Forbidden { response, .. }
            | ClientError::NotFound { response, .. }
            | ClientError::Conflict { response, .. }
            | ClientError::RateLimited { response, .. }
            | ClientError::Rejected { response, .. }
            | ClientError::ServerError { response, .. }
            | ClientError::Decode { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn raw(status: u16) -> Box<RawResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-789"));
        Box::new(RawResponse {
            status_code: status,
            headers,
            body: Default::default(),
        })
    }

    #[test]
    fn test_retryable_errors() {
        let rate_limited = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
            request_id: Some("req-123".to_string()),
            response: raw(429),
        };
        assert!(rate_limited.is_retryable());

        let server_error = ClientError::ServerError {
            status: 503,
            message: "Service unavailable".to_string(),
            request_id: None,
            response: raw(503),
        };
        assert!(server_error.is_retryable());

        let not_implemented = ClientError::ServerError {
            status: 501,
            message: "Not implemented".to_string(),
            request_id: None,
            response: raw(501),
        };
        assert!(!not_implemented.is_retryable());

        let not_found = ClientError::NotFound {
            message: "job".to_string(),
            response: raw(404),
        };
        assert!(!not_found.is_retryable());
        assert!(!ClientError::DeadlineExceeded.is_retryable());
    }

    #[test]
    fn test_request_id_extraction() {
        let error = ClientError::RateLimited {
            retry_after: None,
            request_id: Some("req-456".to_string()),
            response: raw(429),
        };
        assert_eq!(error.request_id(), Some("req-456"));

        let decode = ClientError::Decode {
            message: "bad json".to_string(),
            response: raw(200),
        };
        assert_eq!(decode.request_id(), Some("req-789"));

        assert_eq!(ClientError::Validation("x".into()).request_id(), None);
    }

    #[test]
    fn test_deadline_message() {
        let err = ClientError::DeadlineExceeded;
        assert!(err.to_string().contains("deadline exceeded"));
        assert!(err.is_cancellation());
        assert!(err.response().is_none());
    }

    #[test]
    fn test_status_code_from_response() {
        let err = ClientError::Forbidden {
            message: "nope".to_string(),
            response: raw(403),
        };
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(ClientError::Cancelled.status_code(), None);
    }
}
