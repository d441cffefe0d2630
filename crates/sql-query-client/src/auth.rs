//! Request authenticators.
//!
//! An [`Authenticator`] is validated once when the client is built and then
//! asked to decorate the headers of every outgoing request. Clones of a
//! client share the same authenticator through an `Arc`.

use crate::error::{ClientError, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::fmt;

pub const AUTHTYPE_NOAUTH: &str = "noauth";
pub const AUTHTYPE_BASIC: &str = "basic";
pub const AUTHTYPE_BEARER_TOKEN: &str = "bearertoken";

/// Attaches credentials to outgoing requests.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Short name of the scheme (`noauth`, `basic`, `bearertoken`).
    fn authentication_type(&self) -> &'static str;

    /// Check that the authenticator is usable. Called at client construction.
    fn validate(&self) -> Result<()>;

    /// Add authentication headers for one request.
    fn authenticate(&self, headers: &mut HeaderMap) -> Result<()>;
}

/// Sends requests without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthAuthenticator;

impl Authenticator for NoAuthAuthenticator {
    fn authentication_type(&self) -> &'static str {
        AUTHTYPE_NOAUTH
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn authenticate(&self, _headers: &mut HeaderMap) -> Result<()> {
        Ok(())
    }
}

/// HTTP Basic authentication (RFC 7617).
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

impl Authenticator for BasicAuthenticator {
    fn authentication_type(&self) -> &'static str {
        AUTHTYPE_BASIC
    }

    fn validate(&self) -> Result<()> {
        validate_credential("username", &self.username)?;
        validate_credential("password", &self.password)
    }

    fn authenticate(&self, headers: &mut HeaderMap) -> Result<()> {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
        let value = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|_| ClientError::Authentication("invalid basic credentials".to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Sends a caller-supplied bearer token.
///
/// Obtaining and refreshing the token is the caller's responsibility.
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    token: String,
}

impl BearerTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuthenticator")
            .field("token", &"***REDACTED***")
            .finish()
    }
}

impl Authenticator for BearerTokenAuthenticator {
    fn authentication_type(&self) -> &'static str {
        AUTHTYPE_BEARER_TOKEN
    }

    fn validate(&self) -> Result<()> {
        validate_credential("bearer token", &self.token)
    }

    fn authenticate(&self, headers: &mut HeaderMap) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ClientError::Authentication("invalid bearer token".to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

// Values copied from JSON or shell quoting often keep their braces/quotes.
fn validate_credential(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::Authentication(format!("{name} cannot be empty")));
    }
    let bad = |c: char| matches!(c, '{' | '}' | '"');
    if value.starts_with(bad) || value.ends_with(bad) {
        return Err(ClientError::Authentication(format!(
            "{name} must not begin or end with '{{', '}}' or '\"'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noauth_adds_nothing() {
        let mut headers = HeaderMap::new();
        NoAuthAuthenticator.authenticate(&mut headers).unwrap();
        assert!(headers.is_empty());
        assert!(NoAuthAuthenticator.validate().is_ok());
    }

    #[test]
    fn test_basic_auth_encoding() {
        let auth = BasicAuthenticator::new("alice", "secret123");
        let mut headers = HeaderMap::new();
        auth.authenticate(&mut headers).unwrap();

        // base64("alice:secret123")
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Basic YWxpY2U6c2VjcmV0MTIz"
        );
    }

    #[test]
    fn test_basic_auth_empty_credentials_invalid() {
        assert!(BasicAuthenticator::new("", "").validate().is_err());
        assert!(BasicAuthenticator::new("alice", "").validate().is_err());
        assert!(BasicAuthenticator::new("{alice}", "pw").validate().is_err());
    }

    #[test]
    fn test_bearer_token() {
        let auth = BearerTokenAuthenticator::new("tok-123");
        assert!(auth.validate().is_ok());

        let mut headers = HeaderMap::new();
        auth.authenticate(&mut headers).unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_secrets_masked_in_debug() {
        let basic = format!("{:?}", BasicAuthenticator::new("alice", "super_secret"));
        assert!(!basic.contains("super_secret"));
        assert!(basic.contains("REDACTED"));

        let bearer = format!("{:?}", BearerTokenAuthenticator::new("tok-secret"));
        assert!(!bearer.contains("tok-secret"));
    }
}
