//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub cache_max_entries: usize,
    /// TTL in seconds for cache entries stored without an explicit TTL
    pub cache_ttl: u64,
    /// Cache service port
    pub cache_port: u16,
    /// Limits service port
    pub limits_port: u16,
    /// Metrics service port
    pub metrics_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Seconds between snapshot writes
    pub snapshot_interval: u64,
    /// Snapshot file for the limits service
    pub limits_snapshot_path: PathBuf,
    /// Snapshot file for the metrics service
    pub metrics_snapshot_path: PathBuf,
    /// Snapshot file for the cache; the cache is not persisted when unset
    pub cache_snapshot_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL` - Default entry TTL in seconds (default: 600)
    /// - `CACHE_PORT` - Cache service port (default: 5566)
    /// - `LIMITS_PORT` - Limits service port (default: 5577)
    /// - `METRICS_PORT` - Metrics service port (default: 5555)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `SNAPSHOT_INTERVAL` - Snapshot frequency in seconds (default: 60)
    /// - `LIMITS_SNAPSHOT_PATH` - (default: ./limits/limits_backup.json)
    /// - `METRICS_SNAPSHOT_PATH` - (default: ./metrics/metrics_backup.json)
    /// - `CACHE_SNAPSHOT_PATH` - (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_ttl: env_or("CACHE_TTL", defaults.cache_ttl),
            cache_port: env_or("CACHE_PORT", defaults.cache_port),
            limits_port: env_or("LIMITS_PORT", defaults.limits_port),
            metrics_port: env_or("METRICS_PORT", defaults.metrics_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            snapshot_interval: env_or("SNAPSHOT_INTERVAL", defaults.snapshot_interval),
            limits_snapshot_path: env_or("LIMITS_SNAPSHOT_PATH", defaults.limits_snapshot_path),
            metrics_snapshot_path: env_or("METRICS_SNAPSHOT_PATH", defaults.metrics_snapshot_path),
            cache_snapshot_path: env::var("CACHE_SNAPSHOT_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }

    pub fn snapshot_period(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval.max(1))
    }
}

/// Parses `key` from the environment, falling back to `default` when unset
/// or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_entries: 1000,
            cache_ttl: 600,
            cache_port: 5566,
            limits_port: 5577,
            metrics_port: 5555,
            cleanup_interval: 1,
            snapshot_interval: 60,
            limits_snapshot_path: PathBuf::from("./limits/limits_backup.json"),
            metrics_snapshot_path: PathBuf::from("./metrics/metrics_backup.json"),
            cache_snapshot_path: None,
        }
    }
}
