//! Configuration management for pfa-api.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "pfa-api";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "users.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "PFA_";

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Lowest and highest cost bcrypt accepts.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PFA_`, sections split by `__`,
///    e.g. `PFA_AUTH__JWT_SECRET`)
/// 2. TOML config file at `~/.config/pfa-api/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener configuration.
    pub server: ServerConfig,
    /// Token and password configuration.
    pub auth: AuthConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,
    /// CORS configuration.
    pub cors: CorsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Token and password configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens. Required to serve.
    pub jwt_secret: Option<String>,
    /// Value of the `iss` claim.
    pub issuer: String,
    /// Token lifetime in hours.
    pub token_ttl_hours: u32,
    /// bcrypt cost factor.
    pub bcrypt_cost: u32,
    /// Create `admin/admin` and `user/user` when no accounts exist.
    pub seed_default_users: bool,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/pfa-api/users.db`
    pub database_path: Option<PathBuf>,
    /// How often expired token revocations are pruned, in minutes.
    pub prune_interval_minutes: u32,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable per-address rate limiting.
    pub enabled: bool,
    /// Requests per minute per address on login and verify.
    pub auth_per_minute: u32,
    /// Requests per minute per address on every other route.
    pub api_per_minute: u32,
}

/// CORS configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` allows any origin.
    pub origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "pfa-api".to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed_default_users: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            prune_interval_minutes: 60,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_per_minute: 5,
            api_per_minute: 10,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `PFA_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_validation("server.host must not be empty"));
        }

        if self.auth.token_ttl_hours == 0 {
            return Err(Error::config_validation(
                "auth.token_ttl_hours must be greater than 0",
            ));
        }

        if !BCRYPT_COST_RANGE.contains(&self.auth.bcrypt_cost) {
            return Err(Error::config_validation(format!(
                "auth.bcrypt_cost ({}) must be between {} and {}",
                self.auth.bcrypt_cost,
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end()
            )));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.auth_per_minute == 0 || self.rate_limit.api_per_minute == 0)
        {
            return Err(Error::config_validation(
                "rate limits must be greater than 0 when rate limiting is enabled",
            ));
        }

        if self.cors.origins.is_empty() {
            return Err(Error::config_validation("cors.origins must not be empty"));
        }

        if self.storage.prune_interval_minutes == 0 {
            return Err(Error::config_validation(
                "storage.prune_interval_minutes must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the signing secret, failing if it is unset or too short.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable secret is configured.
    pub fn jwt_secret(&self) -> Result<&str> {
        match self.auth.jwt_secret.as_deref() {
            None => Err(Error::config_validation(
                "auth.jwt_secret is not set (use PFA_AUTH__JWT_SECRET or the config file)",
            )),
            Some(secret) if secret.len() < MIN_SECRET_LENGTH => {
                Err(Error::config_validation(format!(
                    "auth.jwt_secret must be at least {MIN_SECRET_LENGTH} bytes"
                )))
            }
            Some(secret) => Ok(secret),
        }
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Resolve the listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                Error::config_validation(format!(
                    "invalid listen address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }

    /// Get the token lifetime as a Duration.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.auth.token_ttl_hours) * 60 * 60)
    }

    /// Get the revocation prune interval as a Duration.
    #[must_use]
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.storage.prune_interval_minutes) * 60)
    }
}
