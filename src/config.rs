//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Backing provider requested by the application.
///
/// Only `Memory` is implemented; the other providers are parsed so that a
/// misconfiguration is reported instead of silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Memory,
    Redis,
    Memcached,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Memory => "memory",
            Provider::Redis => "redis",
            Provider::Memcached => "memcached",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Provider::Memory),
            "redis" => Ok(Provider::Redis),
            "memcached" => Ok(Provider::Memcached),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache provider '{}'",
                other
            ))),
        }
    }
}

/// The four TTL tiers applications pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTiers {
    pub short: Duration,
    /// Used by `set` when no explicit TTL is given
    pub medium: Duration,
    pub long: Duration,
    pub day: Duration,
}

impl Default for TtlTiers {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            medium: Duration::from_secs(300),
            long: Duration::from_secs(3600),
            day: Duration::from_secs(86_400),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Requested backing provider
    pub provider: Provider,
    /// TTL tiers
    pub ttl: TtlTiers,
    /// Memory bound in bytes, None = unbounded
    pub max_memory: Option<u64>,
    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
    /// HTTP facade port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PROVIDER` - memory, redis or memcached (default: memory)
    /// - `CACHE_TTL_SHORT` / `CACHE_TTL_MEDIUM` / `CACHE_TTL_LONG` / `CACHE_TTL_DAY` -
    ///   TTL tiers in seconds (defaults: 60 / 300 / 3600 / 86400)
    /// - `CACHE_MAX_MEMORY` - Memory bound in bytes, 0 disables it (default: 100 MiB)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP facade port (default: 3000)
    ///
    /// Numeric values that fail to parse fall back to their defaults. An
    /// unknown provider name or a zero sweep interval is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let provider = match env::var("CACHE_PROVIDER") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.provider,
        };

        let ttl = TtlTiers {
            short: secs_var("CACHE_TTL_SHORT", defaults.ttl.short),
            medium: secs_var("CACHE_TTL_MEDIUM", defaults.ttl.medium),
            long: secs_var("CACHE_TTL_LONG", defaults.ttl.long),
            day: secs_var("CACHE_TTL_DAY", defaults.ttl.day),
        };

        let max_memory = match parsed_var::<u64>("CACHE_MAX_MEMORY") {
            Some(0) => None,
            Some(bytes) => Some(bytes),
            None => defaults.max_memory,
        };

        let sweep_interval = secs_var("CACHE_SWEEP_INTERVAL", defaults.sweep_interval);
        if sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "CACHE_SWEEP_INTERVAL must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            provider,
            ttl,
            max_memory,
            sweep_interval,
            server_port: parsed_var("SERVER_PORT").unwrap_or(defaults.server_port),
        })
    }

    /// Replaces the memory bound.
    pub fn with_max_memory(mut self, max_memory: Option<u64>) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Replaces the TTL tiers.
    pub fn with_ttl_tiers(mut self, ttl: TtlTiers) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replaces the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Replaces the provider.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Memory,
            ttl: TtlTiers::default(),
            max_memory: Some(100 * 1024 * 1024),
            sweep_interval: Duration::from_secs(60),
            server_port: 3000,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn secs_var(name: &str, default: Duration) -> Duration {
    parsed_var::<u64>(name)
        .map(Duration::from_secs)
        .unwrap_or(default)
}
