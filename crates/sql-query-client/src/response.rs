//! Response envelopes returned alongside decoded models.

use reqwest::header::HeaderMap;

/// A successful operation result together with its HTTP metadata.
#[derive(Debug, Clone)]
pub struct DetailedResponse<T> {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded response model
    pub result: T,
}

impl<T> DetailedResponse<T> {
    /// Discard the metadata and keep the decoded model.
    pub fn into_result(self) -> T {
        self.result
    }

    /// Returns the request ID if the server sent one.
    pub fn request_id(&self) -> Option<&str> {
        request_id(&self.headers)
    }
}

/// An undecoded HTTP response, attached to errors raised after the
/// exchange completed.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as received
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body as lossy UTF-8, for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns the request ID if the server sent one.
    pub fn request_id(&self) -> Option<&str> {
        request_id(&self.headers)
    }
}

fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-request-id").and_then(|v| v.to_str().ok())
}
