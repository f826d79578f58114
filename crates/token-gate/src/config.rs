//! Token Gate configuration.
//!
//! Configuration is loaded from environment variables once at startup. A
//! missing issuer or audience is a fatal error: the process must not serve
//! requests without them.

use common::jwt::{DEFAULT_LEEWAY, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS cache TTL in seconds (10 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 600;

/// Default maximum number of cached signing keys.
pub const DEFAULT_JWKS_CACHE_MAX_KEYS: u64 = 64;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Well-known path of the key set, relative to the issuer.
pub const JWKS_WELL_KNOWN_PATH: &str = ".well-known/jwks.json";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Token Gate configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trusted issuer; tokens must carry exactly this `iss`.
    pub issuer: String,

    /// Expected audience; a token's `aud` must include it.
    pub audience: String,

    /// URL of the issuer's JWKS document.
    pub jwks_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// How long a fetched signing key stays cached.
    pub jwks_cache_ttl: Duration,

    /// Maximum number of signing keys held in the cache.
    pub jwks_cache_max_keys: u64,

    /// Timeout for a single JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Leeway applied to `exp`/`nbf` validation.
    pub jwt_leeway: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuer(String),

    #[error("Invalid JWKS cache configuration: {0}")]
    InvalidJwksCache(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidJwtLeeway(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer = required(vars, "AUTH_ISSUER")?;
        let audience = required(vars, "AUTH_AUDIENCE")?;

        let parsed = reqwest::Url::parse(&issuer).map_err(|e| {
            ConfigError::InvalidIssuer(format!("AUTH_ISSUER must be a valid URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidIssuer(format!(
                "AUTH_ISSUER must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let jwks_url = vars
            .get("AUTH_JWKS_URL")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| jwks_url_for_issuer(&issuer));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let ttl_seconds = parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            ConfigError::InvalidJwksCache,
        )?;
        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidJwksCache(
                "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let jwks_cache_max_keys = parse_u64(
            vars,
            "JWKS_CACHE_MAX_KEYS",
            DEFAULT_JWKS_CACHE_MAX_KEYS,
            ConfigError::InvalidJwksCache,
        )?;
        if jwks_cache_max_keys == 0 {
            return Err(ConfigError::InvalidJwksCache(
                "JWKS_CACHE_MAX_KEYS must be greater than 0".to_string(),
            ));
        }

        let timeout_seconds = parse_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
            ConfigError::InvalidFetchTimeout,
        )?;
        if timeout_seconds == 0 || timeout_seconds > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidFetchTimeout(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                MAX_JWKS_FETCH_TIMEOUT_SECONDS, timeout_seconds
            )));
        }

        let leeway_seconds = parse_u64(
            vars,
            "JWT_LEEWAY_SECONDS",
            DEFAULT_LEEWAY.as_secs(),
            ConfigError::InvalidJwtLeeway,
        )?;
        if leeway_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidJwtLeeway(format!(
                "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                leeway_seconds
            )));
        }

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Config {
            issuer,
            audience,
            jwks_url,
            bind_address,
            jwks_cache_ttl: Duration::from_secs(ttl_seconds),
            jwks_cache_max_keys,
            jwks_fetch_timeout: Duration::from_secs(timeout_seconds),
            jwt_leeway: Duration::from_secs(leeway_seconds),
            log_format,
        })
    }
}

/// Derive the JWKS URL from an issuer, with exactly one `/` between them.
pub fn jwks_url_for_issuer(issuer: &str) -> String {
    format!("{}/{}", issuer.trim_end_matches('/'), JWKS_WELL_KNOWN_PATH)
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| {
            err(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "AUTH_ISSUER".to_string(),
                "https://tenant.example.com/".to_string(),
            ),
            ("AUTH_AUDIENCE".to_string(), "https://api.example.com".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.issuer, "https://tenant.example.com/");
        assert_eq!(config.audience, "https://api.example.com");
        assert_eq!(
            config.jwks_url,
            "https://tenant.example.com/.well-known/jwks.json"
        );
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.jwks_cache_max_keys, 64);
        assert_eq!(config.jwks_fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.jwt_leeway, Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_issuer_is_fatal() {
        let mut vars = base_vars();
        vars.remove("AUTH_ISSUER");

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "AUTH_ISSUER"));
    }

    #[test]
    fn test_missing_audience_is_fatal() {
        let mut vars = base_vars();
        vars.remove("AUTH_AUDIENCE");

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "AUTH_AUDIENCE"));
    }

    #[test]
    fn test_blank_audience_is_treated_as_missing() {
        let mut vars = base_vars();
        vars.insert("AUTH_AUDIENCE".to_string(), "   ".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_issuer_must_be_http_url() {
        let mut vars = base_vars();
        vars.insert("AUTH_ISSUER".to_string(), "not a url".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidIssuer(_))
        ));

        vars.insert("AUTH_ISSUER".to_string(), "ftp://issuer.example.com".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidIssuer(_))
        ));
    }

    #[test]
    fn test_jwks_url_derivation_without_trailing_slash() {
        assert_eq!(
            jwks_url_for_issuer("https://issuer.example.com"),
            "https://issuer.example.com/.well-known/jwks.json"
        );
        assert_eq!(
            jwks_url_for_issuer("https://issuer.example.com/"),
            "https://issuer.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_jwks_url_override() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_JWKS_URL".to_string(),
            "http://127.0.0.1:9999/keys".to_string(),
        );

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwks_url, "http://127.0.0.1:9999/keys");
        // Issuer is untouched by the override
        assert_eq!(config.issuer, "https://tenant.example.com/");
    }

    #[test]
    fn test_zero_cache_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwksCache(_))
        ));
    }

    #[test]
    fn test_non_numeric_cache_size_rejected() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_MAX_KEYS".to_string(), "lots".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("JWKS_CACHE_MAX_KEYS"));
    }

    #[test]
    fn test_fetch_timeout_bounds() {
        let mut vars = base_vars();
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidFetchTimeout(_))
        ));

        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "61".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidFetchTimeout(_))
        ));

        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "60".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwks_fetch_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_leeway_upper_bound() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "600".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwt_leeway, Duration::from_secs(600));

        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "601".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtLeeway(_))
        ));

        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "-5".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtLeeway(_))
        ));
    }

    #[test]
    fn test_log_format() {
        let mut vars = base_vars();
        vars.insert("LOG_FORMAT".to_string(), "json".to_string());
        assert_eq!(Config::from_vars(&vars).unwrap().log_format, LogFormat::Json);

        vars.insert("LOG_FORMAT".to_string(), "xml".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
