//! Server configuration loaded from environment variables.
//!
//! Every setting except the token signing secret has a default suitable for
//! local development. The secret has none: the server refuses to start
//! without `TOKEN_SECRET`.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use alertline_shared::constants::{
    DEFAULT_BCRYPT_COST, DEFAULT_HTTP_PORT, DEFAULT_TOKEN_TTL_SECS, MAX_IMAGE_SIZE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./alertline.db`
    pub database_path: PathBuf,

    /// Directory where report images are written.
    /// Env: `UPLOAD_DIR`
    /// Default: `./uploads`
    pub upload_dir: PathBuf,

    /// Maximum image size in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 10 MiB
    pub max_upload_size: usize,

    /// HMAC secret used to sign bearer tokens.
    /// Env: `TOKEN_SECRET` (required)
    pub token_secret: String,

    /// Bearer token lifetime in seconds.
    /// Env: `TOKEN_TTL_SECS`
    /// Default: `3600`
    pub token_ttl_secs: i64,

    /// bcrypt work factor.
    /// Env: `BCRYPT_COST`
    /// Default: `10`
    pub bcrypt_cost: u32,

    /// Browser origins allowed to call the API with credentials.
    /// Env: `CORS_ORIGINS` (comma-separated)
    /// Default: `http://localhost:5173`
    pub cors_origins: Vec<String>,

    /// Mark the token cookie `Secure`.
    /// Env: `COOKIE_SECURE` (true/false)
    /// Default: `false`
    pub cookie_secure: bool,

    /// Phone number of an existing account to promote to admin at startup.
    /// Env: `BOOTSTRAP_ADMIN_PHONE`
    /// Default: unset.
    pub bootstrap_admin_phone: Option<String>,
}

impl ServerConfig {
    /// Development defaults around an explicit secret.
    pub fn with_secret(token_secret: impl Into<String>) -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./alertline.db"),
            upload_dir: PathBuf::from("./uploads"),
            max_upload_size: MAX_IMAGE_SIZE,
            token_secret: token_secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            cors_origins: vec!["http://localhost:5173".to_string()],
            cookie_secure: false,
            bootstrap_admin_phone: None,
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for everything but the secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("TOKEN_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("TOKEN_SECRET"))?;
        let mut config = Self::with_secret(secret);

        if let Some(addr) = lookup("HTTP_ADDR") {
            config.http_addr = parse_or_warn("HTTP_ADDR", &addr, config.http_addr);
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_UPLOAD_SIZE") {
            config.max_upload_size = parse_or_warn("MAX_UPLOAD_SIZE", &val, config.max_upload_size);
        }

        if let Some(val) = lookup("TOKEN_TTL_SECS") {
            let ttl = parse_or_warn("TOKEN_TTL_SECS", &val, config.token_ttl_secs);
            if ttl > 0 {
                config.token_ttl_secs = ttl;
            }
        }

        if let Some(val) = lookup("BCRYPT_COST") {
            let cost = parse_or_warn("BCRYPT_COST", &val, config.bcrypt_cost);
            // bcrypt accepts 4..=31
            if (4..=31).contains(&cost) {
                config.bcrypt_cost = cost;
            } else {
                tracing::warn!(value = cost, "BCRYPT_COST out of range, using default");
            }
        }

        if let Some(val) = lookup("CORS_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() {
                config.cors_origins = origins;
            }
        }

        if let Some(val) = lookup("COOKIE_SECURE") {
            config.cookie_secure = val == "true" || val == "1";
        }

        if let Some(phone) = lookup("BOOTSTRAP_ADMIN_PHONE") {
            if !phone.trim().is_empty() {
                config.bootstrap_admin_phone = Some(phone.trim().to_string());
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        Ok(config)
    }
}

// Hand-written so the secret never reaches the logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_size", &self.max_upload_size)
            .field("token_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_origins", &self.cors_origins)
            .field("cookie_secure", &self.cookie_secure)
            .field("bootstrap_admin_phone", &self.bootstrap_admin_phone)
            .finish()
    }
}

fn parse_or_warn<T>(key: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            default
        }
    }
}
