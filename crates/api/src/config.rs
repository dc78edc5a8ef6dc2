//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `SMTP_HOST` - SMTP relay host (e.g., in-v3.mailjet.com)
//! - `SMTP_USERNAME` - SMTP username (Mailjet: API public key)
//! - `SMTP_PASSWORD` - SMTP password (Mailjet: API private key)
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 5000)
//! - `CLIENT_URL` - Allowed CORS origin (default: <http://localhost:3000>)
//! - `TOKEN_TTL_DAYS` - Auth token lifetime in days (default: 30)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_FROM` - Sender mailbox (default: `Crime Track <no-reply@crimetrack.app>`)
//! - `CLOUDINARY_UPLOAD_PRESET` - Upload preset (default: crimetrack)
//! - `RATE_LIMIT_ENABLED` - Rate limit public account endpoints (default: true)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Upper bound for `TOKEN_TTL_DAYS` (ten years).
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

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

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text (local development).
    #[default]
    Text,
    /// One JSON object per line (production log shipping).
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Browser origin allowed to call the API with credentials
    pub client_url: Url,
    /// Auth token signing configuration
    pub auth: AuthConfig,
    /// Outbound email configuration
    pub email: EmailConfig,
    /// Cloudinary image hosting configuration
    pub cloudinary: CloudinaryConfig,
    /// Whether public account endpoints are rate limited
    pub rate_limit_enabled: bool,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Auth token configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign auth tokens
    pub jwt_secret: SecretString,
    /// Token lifetime in days
    pub token_ttl_days: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_days", &self.token_ttl_days)
            .finish()
    }
}

/// SMTP email configuration.
///
/// Implements `Debug` manually to redact the SMTP password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender mailbox (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Cloudinary configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (first path segment of the upload API)
    pub cloud_name: String,
    /// API key (sent with signed requests)
    pub api_key: String,
    /// API secret (used to sign requests, never sent)
    pub api_secret: SecretString,
    /// Upload preset applied to every upload
    pub upload_preset: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("upload_preset", &self.upload_preset)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let client_url = Url::parse(&get_env_or_default("CLIENT_URL", "http://localhost:3000"))
            .map_err(|e| ConfigError::InvalidEnvVar("CLIENT_URL".to_string(), e.to_string()))?;

        let auth = AuthConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let rate_limit_enabled = parse_bool("RATE_LIMIT_ENABLED", true)?;
        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            client_url,
            auth,
            email,
            cloudinary,
            rate_limit_enabled,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the CORS origin (`scheme://host[:port]`, no trailing slash).
    #[must_use]
    pub fn cors_origin(&self) -> String {
        self.client_url.origin().ascii_serialization()
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_min_length(&jwt_secret, "JWT_SECRET", MIN_JWT_SECRET_LENGTH)?;

        let token_ttl_days = parse_token_ttl_days(&get_env_or_default("TOKEN_TTL_DAYS", "30"))?;

        Ok(Self {
            jwt_secret,
            token_ttl_days,
        })
    }
}

/// Parse `TOKEN_TTL_DAYS`, bounded to `1..=MAX_TOKEN_TTL_DAYS`.
fn parse_token_ttl_days(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| (1..=MAX_TOKEN_TTL_DAYS).contains(days))
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "TOKEN_TTL_DAYS".to_string(),
                format!("must be a number of days between 1 and {MAX_TOKEN_TTL_DAYS}"),
            )
        })
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_env_or_default("SMTP_FROM", "Crime Track <no-reply@crimetrack.app>"),
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            upload_preset: get_env_or_default("CLOUDINARY_UPLOAD_PRESET", "crimetrack"),
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

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`), falling back to `default` when unset.
fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true or false, got '{other}'"),
        )),
    }
}

/// Validate that a secret meets a minimum length requirement.
fn validate_min_length(
    secret: &SecretString,
    var_name: &str,
    min_length: usize,
) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < min_length {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                min_length,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
impl ApiConfig {
    /// Configuration for router and service tests. Never touches the environment.
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/crime_track_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            client_url: Url::parse("http://localhost:3000").unwrap_or_else(|_| unreachable!()),
            auth: AuthConfig {
                jwt_secret: SecretString::from("q8Z!v2Lr#9mT4wXe@1bN7yKp$3sHd6Fu"),
                token_ttl_days: 30,
            },
            email: EmailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 2525,
                smtp_username: "mailer".to_string(),
                smtp_password: SecretString::from("mailer-pass"),
                from_address: "Crime Track <no-reply@crimetrack.app>".to_string(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "1234567890".to_string(),
                api_secret: SecretString::from("cloud-api-secret"),
                upload_preset: "crimetrack".to_string(),
            },
            rate_limit_enabled: false,
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-goes-here", "JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("q8Z!v2Lr#9mT4wXe@1bN7yKp$3sHd6Fu", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_min_length() {
        let short = SecretString::from("k3Y!");
        assert!(validate_min_length(&short, "JWT_SECRET", MIN_JWT_SECRET_LENGTH).is_err());

        let long = SecretString::from("k".repeat(MIN_JWT_SECRET_LENGTH));
        assert!(validate_min_length(&long, "JWT_SECRET", MIN_JWT_SECRET_LENGTH).is_ok());
    }

    #[test]
    fn test_token_ttl_days_bounds() {
        assert_eq!(parse_token_ttl_days("30").unwrap(), 30);
        assert_eq!(parse_token_ttl_days(" 3650 ").unwrap(), MAX_TOKEN_TTL_DAYS);

        for raw in ["0", "-5", "3651", "100000000", "thirty", ""] {
            assert!(
                matches!(
                    parse_token_ttl_days(raw),
                    Err(ConfigError::InvalidEnvVar(ref name, _)) if name == "TOKEN_TTL_DAYS"
                ),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_socket_addr_and_cors_origin() {
        let mut config = ApiConfig::for_tests();
        config.client_url = Url::parse("https://records.example.org/app/").unwrap();

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
        assert_eq!(config.cors_origin(), "https://records.example.org");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ApiConfig::for_tests();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("demo"));
        assert!(!debug_output.contains("q8Z!v2Lr"));
        assert!(!debug_output.contains("mailer-pass"));
        assert!(!debug_output.contains("cloud-api-secret"));
    }
}
