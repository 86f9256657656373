//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KIOSK_API_URL` - Base URL of the remote commerce API
//! - `KIOSK_API_TOKEN` - Bearer token for authenticated cart/payment endpoints
//!
//! ## Optional
//! - `KIOSK_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `KIOSK_PRODUCT_CACHE_TTL_SECS` - Catalog product cache TTL (default: 60)
//! - `KIOSK_PAYMENT_REDIRECT_DELAY_SECS` - Delay before navigating away after
//!   payment reconciliation finishes (default: 3)
//! - `KIOSK_CURRENCY` - ISO 4217 display currency (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use kiosk_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_PAYMENT_REDIRECT_DELAY_SECS: u64 = 3;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote commerce API configuration
    pub api: CommerceApiConfig,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
    /// Delay before the post-payment navigation fires
    pub payment_redirect_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote commerce API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct CommerceApiConfig {
    /// Base URL, always ending in `/`
    pub base_url: Url,
    /// Bearer token for authenticated endpoints
    pub access_token: SecretString,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// How long catalog products stay cached
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for CommerceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the access token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = CommerceApiConfig::from_env()?;
        let currency = get_env_or_default("KIOSK_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("KIOSK_CURRENCY".to_string(), e.to_string()))?;
        let payment_redirect_delay = get_duration_secs(
            "KIOSK_PAYMENT_REDIRECT_DELAY_SECS",
            DEFAULT_PAYMENT_REDIRECT_DELAY_SECS,
        )?;

        Ok(Self {
            api,
            currency,
            payment_redirect_delay,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `base_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid
    /// absolute URL.
    pub fn for_base_url(base_url: &str, access_token: SecretString) -> Result<Self, ConfigError> {
        Ok(Self {
            api: CommerceApiConfig {
                base_url: parse_base_url("KIOSK_API_URL", base_url)?,
                access_token,
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            },
            currency: CurrencyCode::default(),
            payment_redirect_delay: Duration::from_secs(DEFAULT_PAYMENT_REDIRECT_DELAY_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

impl CommerceApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("KIOSK_API_URL")?;
        Ok(Self {
            base_url: parse_base_url("KIOSK_API_URL", &raw_url)?,
            access_token: get_validated_secret("KIOSK_API_TOKEN")?,
            request_timeout: get_duration_secs(
                "KIOSK_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            product_cache_ttl: get_duration_secs(
                "KIOSK_PRODUCT_CACHE_TTL_SECS",
                DEFAULT_PRODUCT_CACHE_TTL_SECS,
            )?,
        })
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
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds as a `Duration`.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    parse_duration_secs(key, &get_env_or_default(key, &default.to_string()))
}

fn parse_duration_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute http(s) base URL, normalized to end with `/` so relative
/// endpoint paths join beneath it.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validate that a secret is not a placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "must not be empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
