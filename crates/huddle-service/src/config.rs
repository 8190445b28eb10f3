//! Huddle service configuration.
//!
//! Configuration is loaded once at startup from environment variables.
//! Missing or invalid settings are fatal. The database URL and the upstream
//! service credential are redacted in Debug output.

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default timeout for a single forward to the upstream media server.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 10;

/// Default request-level timeout applied to every route.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

/// Huddle service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Base URL of the upstream media server that WHIP/WHEP requests are
    /// forwarded to.
    pub upstream_url: Url,

    /// Service credential attached to every forwarded request.
    /// Empty means callers' Authorization headers pass through untouched.
    pub upstream_token: SecretString,

    /// Timeout for a single upstream forward.
    pub upstream_timeout_seconds: u64,

    /// Request-level timeout for every route.
    pub request_timeout_seconds: u64,

    /// Maximum database pool connections.
    pub db_max_connections: u32,

    /// Directory holding the bundled web UI. When set, unknown GET paths
    /// fall back to `index.html` inside it.
    pub static_dir: Option<String>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("upstream_url", &self.upstream_url.as_str())
            .field(
                "upstream_token",
                &if self.has_upstream_token() {
                    "[REDACTED]"
                } else {
                    "[EMPTY]"
                },
            )
            .field("upstream_timeout_seconds", &self.upstream_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("db_max_connections", &self.db_max_connections)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid database pool configuration: {0}")]
    InvalidPoolSize(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let upstream_url = parse_upstream_url(
            vars.get("UPSTREAM_URL")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("UPSTREAM_URL".to_string()))?,
        )?;

        let upstream_token =
            SecretString::from(vars.get("UPSTREAM_TOKEN").cloned().unwrap_or_default());

        // BIND_ADDRESS wins over PORT when both are present
        let bind_address = match vars.get("BIND_ADDRESS") {
            Some(address) => address.clone(),
            None => {
                let port = match vars.get("PORT") {
                    Some(value_str) => value_str.parse::<u16>().map_err(|e| {
                        ConfigError::InvalidPort(format!(
                            "PORT must be a valid port number, got '{}': {}",
                            value_str, e
                        ))
                    })?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{}", port)
            }
        };

        let upstream_timeout_seconds = parse_positive_seconds(
            vars,
            "UPSTREAM_TIMEOUT_SECONDS",
            DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
        )?;

        let request_timeout_seconds = parse_positive_seconds(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;

        // The upstream must give up first so a slow media server surfaces as 502
        if upstream_timeout_seconds >= request_timeout_seconds {
            return Err(ConfigError::InvalidTimeout(format!(
                "UPSTREAM_TIMEOUT_SECONDS ({}) must be less than REQUEST_TIMEOUT_SECONDS ({})",
                upstream_timeout_seconds, request_timeout_seconds
            )));
        }

        let db_max_connections = if let Some(value_str) = vars.get("DB_MAX_CONNECTIONS") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidPoolSize(format!(
                    "DB_MAX_CONNECTIONS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidPoolSize(
                    "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_DB_MAX_CONNECTIONS
        };

        let static_dir = vars.get("STATIC_DIR").filter(|v| !v.is_empty()).cloned();

        Ok(Config {
            database_url,
            bind_address,
            upstream_url,
            upstream_token,
            upstream_timeout_seconds,
            request_timeout_seconds,
            db_max_connections,
            static_dir,
        })
    }

    /// Whether a non-empty upstream credential is configured.
    pub fn has_upstream_token(&self) -> bool {
        !self.upstream_token.expose_secret().is_empty()
    }
}

fn parse_upstream_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidUpstreamUrl(format!("UPSTREAM_URL '{}' is not a URL: {}", raw, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUpstreamUrl(format!(
            "UPSTREAM_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUpstreamUrl(
            "UPSTREAM_URL must include a host".to_string(),
        ));
    }

    Ok(url)
}

fn parse_positive_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidTimeout(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}
