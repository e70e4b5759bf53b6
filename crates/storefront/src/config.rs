//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `BAZAAR_API_URL` - Backend API base URL (default: `http://localhost:8080/api`)
//! - `BAZAAR_STORAGE_PATH` - Persisted store file (default: `<data dir>/bazaar/storage.json`)
//! - `BAZAAR_HTTP_TIMEOUT_SECS` - Request timeout; unset means no client timeout
//! - `BAZAAR_CACHE_TTL_SECS` - Category cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: development)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate between 0 and 1 (default: 1.0)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const STORAGE_DIR: &str = "bazaar";
const STORAGE_FILE: &str = "storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API base URL, e.g. `http://localhost:8080/api`
    pub api_url: Url,
    /// File holding the persisted store
    pub storage_path: PathBuf,
    /// Per-request timeout; `None` leaves it to the transport
    pub http_timeout: Option<Duration>,
    /// Lifetime of cached category lists
    pub cache_ttl: Duration,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: String,
    pub sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: "development".to_string(),
            sample_rate: 1.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value, or if
    /// no storage path is given and the platform has no data directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let api_url = env.or_default("BAZAAR_API_URL", DEFAULT_API_URL);
        let api_url = parse_api_url(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), e))?;

        let storage_path = match env.optional("BAZAAR_STORAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_storage_path()?,
        };

        let http_timeout = env
            .parsed::<u64>("BAZAAR_HTTP_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let cache_ttl = Duration::from_secs(
            env.parsed::<u64>("BAZAAR_CACHE_TTL_SECS")?
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let sentry = SentryConfig::from_env(&env)?;

        Ok(Self {
            api_url,
            storage_path,
            http_timeout,
            cache_ttl,
            sentry,
        })
    }

    /// Configuration pointing at `api_url` and storing state at
    /// `storage_path`, with defaults for everything else.
    #[must_use]
    pub fn new(api_url: Url, storage_path: PathBuf) -> Self {
        Self {
            api_url,
            storage_path,
            http_timeout: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sentry: SentryConfig::default(),
        }
    }
}

impl SentryConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let sample_rate = env.parsed::<f32>("SENTRY_SAMPLE_RATE")?.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&sample_rate) {
            return Err(ConfigError::InvalidEnvVar(
                "SENTRY_SAMPLE_RATE".to_string(),
                format!("must be between 0 and 1 (got {sample_rate})"),
            ));
        }
        Ok(Self {
            dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            environment: env.or_default("SENTRY_ENVIRONMENT", "development"),
            sample_rate,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source; blank values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional environment variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional environment variable.
    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|v| {
                v.trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Parse and check the API base URL.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(url)
}

/// `<data dir>/bazaar/storage.json`.
fn default_storage_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(STORAGE_DIR).join(STORAGE_FILE))
        .ok_or_else(|| ConfigError::MissingEnvVar("BAZAAR_STORAGE_PATH".to_string()))
}
