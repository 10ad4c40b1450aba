//! Learner site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `EDU_API_URL` - Backend endpoint (absolute http/https URL)
//! - `LEARNER_BASE_URL` - Public URL for the learner site
//!
//! ## Optional
//! - `LEARNER_HOST` - Bind address (default: 127.0.0.1)
//! - `LEARNER_PORT` - Listen port (default: 3000)
//! - `GOOGLE_CLIENT_ID` - Enables the Google sign-in button
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use eduplatform_core::api::ApiConfig;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Learner site configuration.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    /// Backend endpoint
    pub api: ApiConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Google Identity Services client ID
    pub google_client_id: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl LearnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// including a backend URL that still holds the deployment placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = get_api_config("EDU_API_URL")?;
        let host = get_env_or_default("LEARNER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LEARNER_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("LEARNER_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("LEARNER_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("LEARNER_BASE_URL")?;
        let google_client_id = get_optional_env("GOOGLE_CLIENT_ID").filter(|id| !id.is_empty());

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            api,
            host,
            port,
            base_url,
            google_client_id,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Minimal configuration for a local server, used by tests.
    #[must_use]
    pub fn local(api: ApiConfig) -> Self {
        Self {
            api,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            google_client_id: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL of `path` under the public base URL.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load and validate the backend endpoint.
fn get_api_config(key: &str) -> Result<ApiConfig, ConfigError> {
    let raw = get_required_env(key)?;
    ApiConfig::new(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig::new("https://script.google.com/macros/s/abc/exec").unwrap()
    }

    #[test]
    fn test_socket_addr() {
        let config = LearnerConfig {
            port: 3000,
            ..LearnerConfig::local(api())
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure_follows_base_url() {
        let mut config = LearnerConfig::local(api());
        assert!(!config.is_secure());

        config.base_url = "https://learn.example.com".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_absolute_url_keeps_path_prefix() {
        let mut config = LearnerConfig::local(api());
        config.base_url = "https://example.com/learn/".to_string();
        assert_eq!(
            config.absolute_url("/auth/google"),
            "https://example.com/learn/auth/google"
        );
    }

    #[test]
    #[allow(unsafe_code)] // Test-only env mutation on a variable no other test reads
    fn test_placeholder_url_is_rejected() {
        unsafe {
            std::env::set_var(
                "LEARNER_TEST_PLACEHOLDER_URL",
                "https://script.google.com/macros/s/YOUR_GOOGLE_APPS_SCRIPT/exec",
            );
        }

        let err = get_api_config("LEARNER_TEST_PLACEHOLDER_URL").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "LEARNER_TEST_PLACEHOLDER_URL"));
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_missing_api_url() {
        let err = get_api_config("LEARNER_TEST_UNSET_URL").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }
}
