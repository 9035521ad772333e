//! API key request signing

use secrecy::{ExposeSecret, SecretString};
use url::Url;
use url::form_urlencoded::Serializer;

use crate::error::MapKitError;

/// Name of the query parameter carrying the API key
pub const API_KEY_PARAM: &str = "key";

/// Build the URL-encoded query string that authenticates a request
///
/// # Errors
///
/// Returns [`MapKitError::Configuration`] if `api_key` is empty.
pub fn sign_with_api_key(api_key: &str) -> Result<String, MapKitError> {
    if api_key.is_empty() {
        return Err(MapKitError::Configuration("API key missing".to_string()));
    }

    Ok(Serializer::new(String::new())
        .append_pair(API_KEY_PARAM, api_key)
        .finish())
}

/// Signs outgoing request URLs with the client's API key
#[derive(Clone)]
pub struct ApiKeySigner {
    api_key: SecretString,
}

impl std::fmt::Debug for ApiKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySigner")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ApiKeySigner {
    /// Create a signer for the given key
    #[must_use]
    pub const fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }

    /// Signed query string for an endpoint
    ///
    /// Endpoints that do not accept key authentication cannot be signed
    /// and fail instead of going out unauthenticated.
    pub fn auth_query(&self, accepts_api_key: bool) -> Result<String, MapKitError> {
        if !accepts_api_key {
            return Err(MapKitError::Configuration(
                "endpoint does not accept API key authentication".to_string(),
            ));
        }
        sign_with_api_key(self.api_key.expose_secret())
    }

    /// Append the signed query to `url`, keeping any existing parameters
    pub fn sign_url(&self, url: &mut Url, accepts_api_key: bool) -> Result<(), MapKitError> {
        let signed = self.auth_query(accepts_api_key)?;
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{signed}"),
            _ => signed,
        };
        url.set_query(Some(&query));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(key: &str) -> ApiKeySigner {
        ApiKeySigner::new(SecretString::from(key.to_string()))
    }

    #[test]
    fn test_sign_encodes_key() {
        assert_eq!(sign_with_api_key("abc123").unwrap(), "key=abc123");
        assert_eq!(
            sign_with_api_key("a+b/c=d e").unwrap(),
            "key=a%2Bb%2Fc%3Dd+e"
        );
    }

    #[test]
    fn test_sign_rejects_empty_key() {
        let err = sign_with_api_key("").unwrap_err();
        assert!(err.to_string().contains("API key missing"));
    }

    #[test]
    fn test_endpoint_without_key_auth_fails() {
        let err = signer("abc").auth_query(false).unwrap_err();
        assert!(matches!(err, MapKitError::Configuration(_)));
    }

    #[test]
    fn test_sign_url_appends_to_existing_query() {
        let mut url = Url::parse("https://maps.example.com/route?lang=en").unwrap();
        signer("abc").sign_url(&mut url, true).unwrap();
        assert_eq!(url.query(), Some("lang=en&key=abc"));
    }

    #[test]
    fn test_sign_url_without_query() {
        let mut url = Url::parse("https://maps.example.com/route").unwrap();
        signer("abc").sign_url(&mut url, true).unwrap();
        assert_eq!(url.as_str(), "https://maps.example.com/route?key=abc");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", signer("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
