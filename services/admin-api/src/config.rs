//! Configuration for the admin gateway.

use thiserror::Error;

/// Admin gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Base URL of the external auth service
    pub auth_base_url: String,

    /// Whether session cookies carry the Secure attribute
    pub secure_cookies: bool,

    /// Sign-in redirect path
    pub sign_in_path: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid environment variable: {0}")]
    Invalid(&'static str),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_base_url =
            std::env::var("AUTH_BASE_URL").map_err(|_| ConfigError::Missing("AUTH_BASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Disable only for local development over plain HTTP
        let secure_cookies = !matches!(
            std::env::var("INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true")
        );

        let sign_in_path =
            std::env::var("SIGN_IN_PATH").unwrap_or_else(|_| "/signin".to_string());

        Ok(Self {
            http_port,
            auth_base_url,
            secure_cookies,
            sign_in_path,
        })
    }
}
