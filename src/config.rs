//! Runtime configuration for the webhook binary.
//!
//! Read from environment variables; every setting has a default that matches
//! the standard deployment manifests.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Default health server port
pub const HEALTH_PORT: u16 = 8080;
/// Default executor lookup timeout in seconds
pub const EXECUTOR_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Error loading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Webhook configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// TLS certificate (PEM)
    pub cert_path: PathBuf,
    /// TLS private key (PEM)
    pub key_path: PathBuf,
    /// Port for the TLS webhook server
    pub webhook_port: u16,
    /// Port for probes and metrics
    pub health_port: u16,
    /// Upper bound on a single SpinAppExecutor lookup
    pub executor_lookup_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
            webhook_port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            executor_lookup_timeout: Duration::from_secs(EXECUTOR_LOOKUP_TIMEOUT_SECS),
        }
    }
}

impl WebhookConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` to read variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs = parse_var(&lookup, "EXECUTOR_LOOKUP_TIMEOUT_SECS")?
            .unwrap_or(EXECUTOR_LOOKUP_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "EXECUTOR_LOOKUP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            cert_path: lookup("WEBHOOK_CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_path),
            key_path: lookup("WEBHOOK_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_path),
            webhook_port: parse_var(&lookup, "WEBHOOK_PORT")?.unwrap_or(defaults.webhook_port),
            health_port: parse_var(&lookup, "HEALTH_PORT")?.unwrap_or(defaults.health_port),
            executor_lookup_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Whether both TLS files exist, so the webhook server can start
    pub fn tls_available(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            }),
    }
}
