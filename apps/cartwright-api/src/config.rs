//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted cart TTL (ten years).
pub const MAX_CART_TTL_HOURS: i64 = 24 * 365 * 10;

/// Where session carts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartStoreKind {
    /// `cart_lines` table, survives restarts.
    Sqlite,
    /// Process memory, lost on restart. Useful for local runs and demos.
    Memory,
}

impl FromStr for CartStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(CartStoreKind::Sqlite),
            "memory" => Ok(CartStoreKind::Memory),
            _ => Err(ConfigError::InvalidValue("CARTWRIGHT_CART_STORE".to_string())),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind
    pub host: IpAddr,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Cart persistence backend
    pub cart_store: CartStoreKind,

    /// Carts untouched for this long are swept
    pub cart_ttl_hours: i64,

    /// How often the sweeper runs
    pub sweep_interval_secs: u64,

    /// Add `Secure` to the session cookie (set behind HTTPS)
    pub secure_cookies: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            database_path: "./data/cartwright.db".to_string(),
            db_max_connections: 5,
            cart_store: CartStoreKind::Sqlite,
            cart_ttl_hours: 72,
            sweep_interval_secs: 900,
            secure_cookies: false,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup. `load` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            host: parse_or("CARTWRIGHT_HOST", &lookup, defaults.host)?,

            port: parse_or("CARTWRIGHT_PORT", &lookup, defaults.port)?,

            database_path: lookup("CARTWRIGHT_DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_or(
                "CARTWRIGHT_DB_MAX_CONNECTIONS",
                &lookup,
                defaults.db_max_connections,
            )?,

            cart_store: parse_or("CARTWRIGHT_CART_STORE", &lookup, defaults.cart_store)?,

            cart_ttl_hours: parse_or("CARTWRIGHT_CART_TTL_HOURS", &lookup, defaults.cart_ttl_hours)?,

            sweep_interval_secs: parse_or(
                "CARTWRIGHT_SWEEP_INTERVAL_SECS",
                &lookup,
                defaults.sweep_interval_secs,
            )?,

            secure_cookies: parse_or("CARTWRIGHT_SECURE_COOKIES", &lookup, defaults.secure_cookies)?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "CARTWRIGHT_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if !(1..=MAX_CART_TTL_HOURS).contains(&config.cart_ttl_hours) {
            return Err(ConfigError::InvalidValue("CARTWRIGHT_CART_TTL_HOURS".to_string()));
        }
        if config.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "CARTWRIGHT_SWEEP_INTERVAL_SECS".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Idle lifetime of a cart and its session cookie.
    pub fn cart_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cart_ttl_hours.clamp(1, MAX_CART_TTL_HOURS))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.database_path, "./data/cartwright.db");
        assert_eq!(config.cart_store, CartStoreKind::Sqlite);
        assert_eq!(config.cart_ttl_hours, 72);
        assert_eq!(config.sweep_interval(), Duration::from_secs(900));
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CARTWRIGHT_HOST", "0.0.0.0"),
            ("CARTWRIGHT_PORT", "8080"),
            ("CARTWRIGHT_CART_STORE", "Memory"),
            ("CARTWRIGHT_SECURE_COOKIES", "true"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.cart_store, CartStoreKind::Memory);
        assert!(config.secure_cookies);
    }

    #[test]
    fn test_cart_ttl_never_overflows() {
        let config = ApiConfig {
            cart_ttl_hours: i64::MAX,
            ..ApiConfig::default()
        };
        assert_eq!(config.cart_ttl(), chrono::Duration::hours(MAX_CART_TTL_HOURS));
        assert_eq!(ApiConfig::default().cart_ttl(), chrono::Duration::hours(72));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("CARTWRIGHT_PORT", "http")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for CARTWRIGHT_PORT");

        let err = load(&[("CARTWRIGHT_CART_STORE", "redis")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for CARTWRIGHT_CART_STORE");

        assert!(load(&[("CARTWRIGHT_CART_TTL_HOURS", "0")]).is_err());
        let err = load(&[("CARTWRIGHT_CART_TTL_HOURS", "9000000000000000")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for CARTWRIGHT_CART_TTL_HOURS");
        assert!(load(&[("CARTWRIGHT_CART_TTL_HOURS", "87601")]).is_err());
        assert!(load(&[("CARTWRIGHT_CART_TTL_HOURS", "87600")]).is_ok());
        assert!(load(&[("CARTWRIGHT_SWEEP_INTERVAL_SECS", "0")]).is_err());
    }
}
