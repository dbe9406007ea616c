//! Configuration loading and validation.
//!
//! Values are layered: built-in defaults, then `MCUBED_*` environment
//! variables, then command-line flags. The process exits with a clear error
//! message if the result is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix for environment variables, e.g. `MCUBED_PASSWORD`.
pub const ENV_PREFIX: &str = "MCUBED";

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Path of the encrypted database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Passphrase the database is encrypted with. **Required.**
    #[serde(default)]
    pub password: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Per-request timeout for the HTTP server.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_db_path() -> String {
    "mCubedDB.json".into()
}
fn default_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_request_timeout() -> u64 {
    30
}

/// Values given on the command line; each one wins over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load and validate configuration from the environment and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::load_from(config::Environment::with_prefix(ENV_PREFIX), overrides)
    }

    fn load_from(env: config::Environment, overrides: &Overrides) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .set_override_option("db_path", overrides.db_path.clone())?
            .set_override_option("password", overrides.password.clone())?
            .set_override_option("port", overrides.port.map(i64::from))?
            .set_override_option("log_level", overrides.log_level.clone())?
            .build()
            .context("failed to build configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.password, "MCUBED_PASSWORD (--password)")?;
        ensure_non_empty(&self.db_path, "MCUBED_DB_PATH (--db-path)")?;

        if self.port == 0 {
            anyhow::bail!("MCUBED_PORT must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("MCUBED_REQUEST_TIMEOUT_SECS must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "MCUBED_OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
