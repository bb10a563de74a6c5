//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default request body cap (200 MiB).
const DEFAULT_MAX_BODY_SIZE: usize = 200 * 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Per-IP requests per second on API routes
    pub rate_limit_rps: u32,
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    pub metrics_enabled: bool,
    pub pipeline: PipelineConfig,
}

/// Settings for the upload pipeline itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where uploads and compressed artifacts are spooled
    pub upload_dir: PathBuf,
    pub visibility_attempts: u32,
    pub visibility_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join("dscan"),
            visibility_attempts: 5,
            visibility_delay: Duration::from_millis(100),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upload_dir: std::env::var("UPLOAD_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            visibility_attempts: env_parse("FILE_VISIBILITY_ATTEMPTS", defaults.visibility_attempts)
                .max(1),
            visibility_delay: Duration::from_millis(env_parse("FILE_VISIBILITY_DELAY_MS", 100)),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            environment: "development".to_string(),
            metrics_enabled: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", 10),
            max_body_size: env_parse("MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            pipeline: PipelineConfig::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
