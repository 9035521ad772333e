//! Map Kit client configuration

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable prefix, e.g. `MAPKIT_API_KEY`
pub const ENV_PREFIX: &str = "MAPKIT";

/// Configuration for [`crate::MapKitClient`]
#[derive(Clone, Serialize, Deserialize)]
pub struct MapKitConfig {
    /// API key sent as the `key` query parameter
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Overrides the endpoint host, e.g. for a proxy or a test server
    #[serde(default)]
    pub base_url: Option<String>,

    /// Outbound request ceiling (0 disables rate limiting)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Client identifier appended to the `User-Agent` header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_requests_per_second() -> u32 {
    50
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("MapKitRustClient/{}", env!("CARGO_PKG_VERSION"))
}

impl std::fmt::Debug for MapKitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapKitConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for MapKitConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl MapKitConfig {
    /// Default configuration with the given API key
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            ..Default::default()
        }
    }

    /// Configuration pointing at a local test server, without rate limiting
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            requests_per_second: 0,
            timeout_secs: 5,
            ..Self::with_api_key("test-api-key")
        }
    }

    /// Load configuration from an optional TOML file and `MAPKIT_*`
    /// environment variables, the latter taking precedence
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        Self::load_from(::config::Config::builder(), path)
    }

    /// Same as [`Self::load`], but falls back to `requests_per_second`
    /// instead of the library default when neither source sets a ceiling
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or holds invalid values.
    pub fn load_with_requests_per_second(
        path: Option<&Path>,
        requests_per_second: u32,
    ) -> Result<Self, ::config::ConfigError> {
        let builder = ::config::Config::builder()
            .set_default("requests_per_second", i64::from(requests_per_second))?;
        Self::load_from(builder, path)
    }

    fn load_from(
        mut builder: ::config::builder::ConfigBuilder<::config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self, ::config::ConfigError> {
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        let config = builder
            // e.g. MAPKIT_API_KEY, MAPKIT_REQUESTS_PER_SECOND
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// Whether rate limiting is active
    #[must_use]
    pub const fn rate_limited(&self) -> bool {
        self.requests_per_second > 0
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        match &self.api_key {
            None => return Err("API key missing".to_string()),
            Some(key) if key.expose_secret().trim().is_empty() => {
                return Err("API key must not be empty".to_string());
            },
            Some(_) => {},
        }

        if let Some(base_url) = &self.base_url {
            let parsed =
                Url::parse(base_url).map_err(|e| format!("invalid base_url '{base_url}': {e}"))?;
            if parsed.cannot_be_a_base() {
                return Err(format!("base_url '{base_url}' cannot be used as a base"));
            }
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapKitConfig::default();
        assert!(config.api_key.is_none());
        assert!(config.base_url.is_none());
        assert_eq!(config.requests_per_second, 50);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.user_agent.starts_with("MapKitRustClient/"));
        assert!(config.rate_limited());
    }

    #[test]
    fn test_testing_config() {
        let config = MapKitConfig::for_testing("http://127.0.0.1:8080");
        assert!(!config.rate_limited());
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_success() {
        assert!(MapKitConfig::with_api_key("abc").validate().is_ok());
    }

    #[test]
    fn test_validation_missing_key() {
        let err = MapKitConfig::default().validate().unwrap_err();
        assert!(err.contains("API key missing"));
    }

    #[test]
    fn test_validation_empty_key() {
        assert!(MapKitConfig::with_api_key("  ").validate().is_err());
    }

    #[test]
    fn test_validation_bad_base_url() {
        let config = MapKitConfig {
            base_url: Some("not a url".to_string()),
            ..MapKitConfig::with_api_key("abc")
        };
        assert!(config.validate().is_err());

        let config = MapKitConfig {
            base_url: Some("mailto:maps@example.com".to_string()),
            ..MapKitConfig::with_api_key("abc")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = MapKitConfig {
            timeout_secs: 0,
            ..MapKitConfig::with_api_key("abc")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", MapKitConfig::with_api_key("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_serialization_skips_key() {
        let json = serde_json::to_string(&MapKitConfig::with_api_key("super-secret")).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("api_key"));

        let deserialized: MapKitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.requests_per_second, 50);
        assert!(deserialized.api_key.is_none());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: MapKitConfig =
            serde_json::from_str(r#"{"api_key":"abc","requests_per_second":0}"#).unwrap();
        assert_eq!(config.api_key.unwrap().expose_secret(), "abc");
        assert_eq!(config.requests_per_second, 0);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "api_key = \"file-key\"\nbase_url = \"http://localhost:9000\"\nrequests_per_second = 5"
        )
        .unwrap();

        let config = MapKitConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api_key.unwrap().expose_secret(), "file-key");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.requests_per_second, 5);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_with_fallback_rate() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            MapKitConfig::load_with_requests_per_second(Some(&dir.path().join("absent.toml")), 2)
                .unwrap();
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_file_rate_beats_fallback() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "requests_per_second = 7").unwrap();

        let config = MapKitConfig::load_with_requests_per_second(Some(file.path()), 2).unwrap();
        assert_eq!(config.requests_per_second, 7);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapKitConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.connect_timeout_secs, 10);
    }
}
