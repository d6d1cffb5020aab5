//! Service configuration loaded from the environment

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Sign-in sessions last three days
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3 * 24 * 60 * 60;

/// OAuth sessions last seven days
pub const DEFAULT_OAUTH_SESSION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for any configured session lifetime
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid value for {name}: {value:?}")),
        Err(_) => Ok(default),
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// # Environment Variables
    /// - `HOST` (default `0.0.0.0`)
    /// - `PORT` (default 8080)
    /// - `SHUTDOWN_GRACE_SECONDS` (default 30)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 8080)?,
            shutdown_grace: Duration::from_secs(env_or("SHUTDOWN_GRACE_SECONDS", 30)?),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Session lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub oauth_ttl_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            oauth_ttl_seconds: DEFAULT_OAUTH_SESSION_TTL_SECONDS,
        }
    }
}

impl SessionConfig {
    /// # Environment Variables
    /// - `SESSION_TTL_SECONDS` (default 259200)
    /// - `OAUTH_SESSION_TTL_SECONDS` (default 604800)
    ///
    /// Zero is rejected; values above one year are clamped.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ttl_seconds: ttl("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS)?,
            oauth_ttl_seconds: ttl(
                "OAUTH_SESSION_TTL_SECONDS",
                DEFAULT_OAUTH_SESSION_TTL_SECONDS,
            )?,
        })
    }
}

fn ttl(name: &str, default: u64) -> Result<u64> {
    let seconds = env_or(name, default)?;
    if seconds == 0 {
        bail!("{name} must be greater than zero");
    }
    Ok(seconds.min(MAX_SESSION_TTL_SECONDS))
}

/// Where users, snippets and sessions live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL and Redis
    Postgres,
    /// In-process stores, nothing survives a restart
    Memory,
}

impl StorageBackend {
    /// # Environment Variables
    /// - `SNIPNET_STORAGE`: `postgres` (default) or `memory`
    pub fn from_env() -> Result<Self> {
        match std::env::var("SNIPNET_STORAGE") {
            Ok(value) => value.parse(),
            Err(_) => Ok(StorageBackend::Postgres),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("Unknown storage backend {other:?}"),
        }
    }
}
