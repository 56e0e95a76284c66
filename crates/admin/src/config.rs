//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONSOLE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CONSOLE_BASE_URL` - Public URL of the console, used for invite and check-in links
//! - `CONSOLE_SESSION_SECRET` - Session and token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CONSOLE_HOST` - Bind address (default: 127.0.0.1)
//! - `CONSOLE_PORT` - Listen port (default: 3001)
//! - `CONSOLE_UPLOAD_DIR` - Directory for avatar uploads (default: uploads)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (SMTP - all of these or none; without them emails are logged)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//! - `SMTP_PORT` - SMTP port (default: 587)
//!
//! ## Optional (TLS)
//! - `CONSOLE_TLS_CERT` - PEM-encoded certificate chain
//! - `CONSOLE_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_CHARS: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Fragments that give away a copied-in example value (matched case-insensitively).
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
    "put-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Console application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Session secret, also the key for hashing invite tokens and login codes
    pub session_secret: SecretString,
    /// Where uploaded avatars are written
    pub upload_dir: PathBuf,
    /// SMTP settings; emails are logged instead when absent
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    /// Error sample rate, 0.0 to 1.0
    pub sentry_sample_rate: f32,
    /// Trace sample rate, 0.0 to 1.0
    pub sentry_traces_sample_rate: f32,
    pub tls: Option<TlsConfig>,
}

/// SMTP settings. `Debug` redacts the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// From header for invite and sign-in code emails
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

/// PEM material for HTTPS. `Debug` hides both halves.
#[derive(Clone)]
pub struct TlsConfig {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Typed access to a variable source (the process env, or a map in tests).
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and non-empty.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
        })
    }

    fn sample_rate(&self, key: &str) -> Result<f32, ConfigError> {
        let rate: f32 = self.parsed_or(key, 1.0)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_owned(),
                format!("{rate} is outside 0.0..=1.0"),
            ))
        }
    }

    /// Present, strong enough, and wrapped so it never reaches a log line.
    fn secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        check_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }

    fn email(&self) -> Result<Option<EmailConfig>, ConfigError> {
        let parts = (
            self.optional("SMTP_HOST"),
            self.optional("SMTP_USERNAME"),
            self.optional("SMTP_PASSWORD"),
            self.optional("SMTP_FROM"),
        );
        match parts {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                check_secret_strength(&password, "SMTP_PASSWORD")?;
                Ok(Some(EmailConfig {
                    smtp_host,
                    smtp_port: self.parsed_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_owned(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_owned(),
            )),
        }
    }

    fn tls(&self) -> Result<Option<TlsConfig>, ConfigError> {
        match (self.optional("CONSOLE_TLS_CERT"), self.optional("CONSOLE_TLS_KEY")) {
            (Some(cert_pem), Some(key)) => Ok(Some(TlsConfig {
                cert_pem,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CONSOLE_TLS_*".to_owned(),
                "CONSOLE_TLS_CERT and CONSOLE_TLS_KEY must be set together".to_owned(),
            )),
        }
    }
}

impl AdminConfig {
    /// Load configuration from the process environment, after reading `.env`
    /// if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// a secret looks like a placeholder or has too little entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => {
                return Err(ConfigError::InvalidEnvVar(".env".to_owned(), e.to_string()));
            }
            _ => {}
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        // Fly's postgres attach only sets DATABASE_URL.
        let database_url = vars
            .optional("CONSOLE_DATABASE_URL")
            .or_else(|| vars.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CONSOLE_DATABASE_URL".to_owned()))?;

        let session_secret = vars.secret("CONSOLE_SESSION_SECRET")?;
        let secret_chars = session_secret.expose_secret().chars().count();
        if secret_chars < MIN_SESSION_SECRET_CHARS {
            return Err(ConfigError::InsecureSecret(
                "CONSOLE_SESSION_SECRET".to_owned(),
                format!("must be at least {MIN_SESSION_SECRET_CHARS} characters (got {secret_chars})"),
            ));
        }

        Ok(Self {
            database_url,
            host: vars.parsed_or("CONSOLE_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: vars.parsed_or("CONSOLE_PORT", DEFAULT_PORT)?,
            base_url: parse_base_url(&vars.required("CONSOLE_BASE_URL")?)?,
            session_secret,
            upload_dir: vars
                .optional("CONSOLE_UPLOAD_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from),
            email: vars.email()?,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: vars.sample_rate("SENTRY_SAMPLE_RATE")?,
            sentry_traces_sample_rate: vars.sample_rate("SENTRY_TRACES_SAMPLE_RATE")?,
            tls: vars.tls()?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is HTTPS; decides the `Secure` cookie flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Link that lets an invitee accept their invite.
    #[must_use]
    pub fn invite_url(&self, token: &str) -> String {
        format!("{}/invite/accept?token={token}", self.base_url)
    }
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("CONSOLE_BASE_URL".to_owned(), reason);
    let parsed = url::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.query().is_some() {
        return Err(invalid("must not carry a query string".to_owned()));
    }
    Ok(raw.trim().trim_end_matches('/').to_owned())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *freq.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    freq.values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder-looking or low-entropy secrets.
fn check_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); use a randomly generated value"
            ),
        ));
    }
    Ok(())
}
