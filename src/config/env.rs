//! Environment variable configuration module.
//!
//! Provides environment variable loading and the global `APP_CONFIG` instance.

use std::env;
use std::path::PathBuf;
use std::sync::Once;

use once_cell::sync::Lazy;

static INIT: Once = Once::new();

/// Desktop browser user agent sent to Kuaishou when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Initializes the environment by loading the .env file.
/// This is called automatically when `get_env` is first used.
fn init_env() {
    INIT.call_once(|| {
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Warning: .env file not found or error loading: {}", e);
        }
    });
}

/// Retrieves an environment variable by key.
///
/// If the variable is not set, returns the provided default value.
/// If no default is provided and the variable is not set, returns an empty string.
pub fn get_env(key: &str, default: Option<&str>) -> String {
    init_env();
    env::var(key).unwrap_or_else(|_| default.unwrap_or("").to_string())
}

/// Retrieves an environment variable as a parsed type.
pub fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    init_env();
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Retrieves an optional environment variable; empty values count as unset.
pub fn get_env_opt(key: &str) -> Option<String> {
    init_env();
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server settings
    pub server_port: String,

    // Environment
    pub is_production: bool,

    // Sentry settings
    pub sentry_dsn: String,
    pub sentry_traces_sample_rate: f32,

    // Kuaishou access
    pub kuaishou_cookie: String,
    pub user_agent: String,
    pub ks_timeout_secs: u64,
    pub ks_max_retry: u32,
    pub ks_proxy: Option<String>,

    // Downloads
    pub download_path: PathBuf,
    pub temp_path: PathBuf,
    pub ks_max_workers: usize,
    pub ks_chunk_size: usize,

    // Cache settings
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub redis_max_connections: usize,

    // CORS settings
    pub cors_origins: String,

    // Rate limiting
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
}

impl AppConfig {
    /// Creates a new `AppConfig` from environment variables.
    pub fn from_env() -> Self {
        let rust_env = get_env("RUST_ENV", Some("development"));
        let is_production = rust_env == "production" || rust_env == "prod";

        Self {
            server_port: get_env("SERVER_PORT", Some("9000")),

            is_production,

            sentry_dsn: get_env("SENTRY_DSN", None),
            sentry_traces_sample_rate: get_env_parsed("SENTRY_TRACES_SAMPLE_RATE", 0.1),

            kuaishou_cookie: get_env("KUAISHOU_COOKIE", None),
            user_agent: get_env("KS_USER_AGENT", Some(DEFAULT_USER_AGENT)),
            ks_timeout_secs: get_env_parsed("KS_TIMEOUT", 15),
            ks_max_retry: get_env_parsed("KS_MAX_RETRY", 2),
            ks_proxy: get_env_opt("KS_PROXY"),

            download_path: PathBuf::from(get_env("DOWNLOAD_PATH", Some("downloaded_videos"))),
            temp_path: PathBuf::from(get_env("TEMP_PATH", Some("temp_download"))),
            ks_max_workers: get_env_parsed::<usize>("KS_MAX_WORKERS", 4).max(1),
            ks_chunk_size: get_env_parsed::<usize>("KS_CHUNK_SIZE", 2 * 1024 * 1024).max(8 * 1024),

            cache_enabled: get_env("CACHE_ENABLED", Some("false")) == "true",
            cache_ttl_secs: get_env_parsed("CACHE_TTL_SECS", 600),
            redis_max_connections: get_env_parsed("REDIS_MAX_CONNECTIONS", 20),

            cors_origins: get_env("CORS_ORIGINS", Some("*")),

            rate_limit_per_second: get_env_parsed::<u64>("RATE_LIMIT_PER_SECOND", 10).max(1),
            rate_limit_burst_size: get_env_parsed::<u32>("RATE_LIMIT_BURST_SIZE", 50).max(1),
        }
    }

    /// Milliseconds between replenished rate limiter tokens, so that a client
    /// sustains `rate_limit_per_second` requests per second after the burst.
    pub fn rate_limit_replenish_ms(&self) -> u64 {
        (1000 / self.rate_limit_per_second.max(1)).max(1)
    }

    /// Creates the download and temp directories if they are missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.download_path)?;
        std::fs::create_dir_all(&self.temp_path)?;
        Ok(())
    }
}

/// Global application configuration instance.
pub static APP_CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    // ============ get_env ============

    #[test]
    fn test_get_env_with_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_12345", Some("default_value"));
        assert_eq!(result, "default_value");
    }

    #[test]
    fn test_get_env_no_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_67890", None);
        assert_eq!(result, "");
    }

    #[test]
    fn test_get_env_unicode_default() {
        let result = get_env("NON_EXISTENT_UNICODE", Some("快手测试"));
        assert_eq!(result, "快手测试");
    }

    // ============ get_env_parsed ============

    #[test]
    fn test_get_env_parsed_default_u32() {
        let result: u32 = get_env_parsed("NON_EXISTENT_U32_VAR", 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_get_env_parsed_default_f32() {
        let result: f32 = get_env_parsed("NON_EXISTENT_F32_VAR", 0.5);
        assert!((result - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_get_env_parsed_default_usize() {
        let result: usize = get_env_parsed("NON_EXISTENT_USIZE_VAR", 100);
        assert_eq!(result, 100);
    }

    // ============ get_env_opt ============

    #[test]
    fn test_get_env_opt_missing_is_none() {
        assert!(get_env_opt("NON_EXISTENT_OPT_VAR_31337").is_none());
    }

    // ============ AppConfig ============

    #[test]
    fn test_app_config_from_env() {
        let config = AppConfig::from_env();

        assert!(!config.server_port.is_empty());
        assert!(config.ks_timeout_secs > 0);
        assert!(config.ks_max_workers >= 1);
        assert!(config.ks_chunk_size >= 8 * 1024);
        assert!(config.rate_limit_per_second > 0);
        assert!(config.rate_limit_burst_size > 0);
    }

    #[test]
    fn test_rate_limit_replenish_interval() {
        let mut config = AppConfig::from_env();

        config.rate_limit_per_second = 10;
        assert_eq!(config.rate_limit_replenish_ms(), 100);

        config.rate_limit_per_second = 1;
        assert_eq!(config.rate_limit_replenish_ms(), 1000);

        config.rate_limit_per_second = 5000;
        assert_eq!(config.rate_limit_replenish_ms(), 1);

        config.rate_limit_per_second = 0;
        assert_eq!(config.rate_limit_replenish_ms(), 1000);
    }

    #[test]
    fn test_app_config_default_port() {
        let config = AppConfig::from_env();
        assert_eq!(config.server_port, get_env("SERVER_PORT", Some("9000")));
    }

    #[test]
    fn test_app_config_user_agent_not_empty() {
        let config = AppConfig::from_env();
        assert!(!config.user_agent.is_empty());
    }

    #[test]
    fn test_app_config_debug() {
        let config = AppConfig::from_env();
        let debug_str = format!("{config:?}");

        assert!(debug_str.contains("AppConfig"));
        assert!(debug_str.contains("download_path"));
        assert!(debug_str.contains("ks_max_retry"));
    }

    #[test]
    fn test_app_config_sentry_traces_sample_rate_range() {
        let config = AppConfig::from_env();
        assert!(config.sentry_traces_sample_rate >= 0.0);
        assert!(config.sentry_traces_sample_rate <= 1.0);
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let base = std::env::temp_dir().join(format!("ks-cfg-{}", uuid::Uuid::new_v4()));
        let mut config = AppConfig::from_env();
        config.download_path = base.join("videos");
        config.temp_path = base.join("tmp");

        config.ensure_dirs().unwrap();
        assert!(config.download_path.is_dir());
        assert!(config.temp_path.is_dir());

        std::fs::remove_dir_all(base).ok();
    }

    #[test]
    fn test_app_config_global_same_instance() {
        let port1 = APP_CONFIG.server_port.clone();
        let port2 = APP_CONFIG.server_port.clone();
        assert_eq!(port1, port2);
    }
}
