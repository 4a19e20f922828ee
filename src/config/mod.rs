//! Configuration module for the versioning core.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Core configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Default TTL for read-cache entries, in milliseconds
    pub cache_ttl_ms: u64,
    /// Attempts for the read-max + insert sequence before a version-number
    /// collision surfaces as CONFLICT
    pub version_retry_limit: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("BRANDHUB_DB_PATH")
            .unwrap_or_else(|_| "./data/brandhub.sqlite".to_string())
            .into();

        let log_level = env::var("BRANDHUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cache_ttl_ms = env::var("BRANDHUB_CACHE_TTL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);

        let version_retry_limit = env::var("BRANDHUB_VERSION_RETRY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Self {
            db_path,
            log_level,
            cache_ttl_ms,
            version_retry_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("BRANDHUB_DB_PATH");
        env::remove_var("BRANDHUB_LOG_LEVEL");
        env::remove_var("BRANDHUB_CACHE_TTL_MS");
        env::remove_var("BRANDHUB_VERSION_RETRY_LIMIT");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from("./data/brandhub.sqlite"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.version_retry_limit, 3);
    }
}
