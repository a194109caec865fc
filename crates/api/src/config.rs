use thiserror::Error;

use crate::auth::JwtConfig;

/// Default `SQLite` location; `mode=rwc` creates the file on first run.
pub const DEFAULT_DB_URL: &str = "sqlite://buildfolio.sqlite3?mode=rwc";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    pub db_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                     |
    /// |------------------------|-----------------------------|
    /// | `HOST`                 | `0.0.0.0`                   |
    /// | `PORT`                 | `3000`                      |
    /// | `BUILDFOLIO_DB_URL`    | [`DEFAULT_DB_URL`]          |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                        |
    /// | `JWT_SECRET`           | required                    |
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `JWT_SECRET` is missing or a numeric variable
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parsed("PORT", 3000_u16)?;
        let db_url = std::env::var("BUILDFOLIO_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parsed("REQUEST_TIMEOUT_SECS", 30_u64)?;
        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            host,
            port,
            db_url,
            cors_origins,
            request_timeout_secs,
            jwt,
        })
    }
}
