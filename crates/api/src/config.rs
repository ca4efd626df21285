use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use jojo_core::scripting::executor::{EngineConfig, DEFAULT_MAX_OUTPUT_BYTES};

/// Configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory scanned for scripts at startup and on reload.
    pub script_dir: PathBuf,
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Serve on this unix domain socket instead of TCP.
    pub unix_socket: Option<PathBuf>,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// Empty means no cross-origin access.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `300`).
    pub request_timeout_secs: u64,
    /// Settings handed to the execution engine.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `JOJO_DIR`             | `/srv/jojo`             |
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `UNIX_SOCKET`          | unset (serve TCP)       |
    /// | `CORS_ORIGINS`         | empty (no CORS)         |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                   |
    /// | `SCRIPT_TIMEOUT_SECS`  | unset (no kill timeout) |
    /// | `INHERIT_ENV`          | `false`                 |
    /// | `MAX_OUTPUT_BYTES`     | `10485760`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let script_dir = lookup("JOJO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/srv/jojo"));

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or("PORT", lookup("PORT"), 3000)?;

        let unix_socket = lookup("UNIX_SOCKET")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| parse("CORS_ORIGINS", origin.to_string()))
            .collect::<Result<Vec<HeaderValue>, _>>()?;

        let request_timeout_secs = parse_or("REQUEST_TIMEOUT_SECS", lookup("REQUEST_TIMEOUT_SECS"), 300)?;

        let script_timeout_secs: Option<u64> = lookup("SCRIPT_TIMEOUT_SECS")
            .map(|value| parse("SCRIPT_TIMEOUT_SECS", value))
            .transpose()?;

        let engine = EngineConfig {
            timeout: script_timeout_secs.map(Duration::from_secs),
            inherit_env: parse_or("INHERIT_ENV", lookup("INHERIT_ENV"), false)?,
            max_output_bytes: parse_or(
                "MAX_OUTPUT_BYTES",
                lookup("MAX_OUTPUT_BYTES"),
                DEFAULT_MAX_OUTPUT_BYTES,
            )?,
        };

        Ok(Self {
            script_dir,
            host,
            port,
            unix_socket,
            cors_origins,
            request_timeout_secs,
            engine,
        })
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|err| ConfigError {
        var,
        reason: err.to_string(),
        value,
    })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| parse(var, value))
}
