use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 2_500;
pub const DEFAULT_REPORT_CACHE_CAPACITY: usize = 512;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let provider_timeout_ms = match env::var("APP_PROVIDER_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => return Err(ConfigError::InvalidTimeout { value: raw }),
            },
            Err(_) => DEFAULT_PROVIDER_TIMEOUT_MS,
        };

        let report_cache_capacity = match env::var("APP_REPORT_CACHE_CAPACITY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::InvalidCacheCapacity { value: raw }),
            },
            Err(_) => DEFAULT_REPORT_CACHE_CAPACITY,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig {
                rulebook_path: optional_path("APP_RULEBOOK_PATH"),
                provider_timeout: Duration::from_millis(provider_timeout_ms),
                assessment_csv: optional_path("APP_ASSESSMENT_CSV"),
                property_json: optional_path("APP_PROPERTY_JSON"),
                regulatory_json: optional_path("APP_REGULATORY_JSON"),
                report_cache_capacity,
            },
        })
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Rule tables and collaborator wiring for the development engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rulebook_path: Option<PathBuf>,
    pub provider_timeout: Duration,
    pub assessment_csv: Option<PathBuf>,
    pub property_json: Option<PathBuf>,
    pub regulatory_json: Option<PathBuf>,
    /// Upper bound on reports kept by the server's in-memory cache.
    pub report_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rulebook_path: None,
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            assessment_csv: None,
            property_json: None,
            regulatory_json: None,
            report_cache_capacity: DEFAULT_REPORT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout { value: String },
    InvalidCacheCapacity { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "APP_PROVIDER_TIMEOUT_MS must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidCacheCapacity { value } => write!(
                f,
                "APP_REPORT_CACHE_CAPACITY must be a positive integer (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidCacheCapacity { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_RULEBOOK_PATH");
        env::remove_var("APP_PROVIDER_TIMEOUT_MS");
        env::remove_var("APP_ASSESSMENT_CSV");
        env::remove_var("APP_PROPERTY_JSON");
        env::remove_var("APP_REGULATORY_JSON");
        env::remove_var("APP_REPORT_CACHE_CAPACITY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine.provider_timeout, Duration::from_millis(2_500));
        assert!(config.engine.rulebook_path.is_none());
        assert!(config.engine.assessment_csv.is_none());
        assert_eq!(
            config.engine.report_cache_capacity,
            DEFAULT_REPORT_CACHE_CAPACITY
        );
    }

    #[test]
    fn report_cache_capacity_must_be_positive() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REPORT_CACHE_CAPACITY", "0");
        let err = AppConfig::load().expect_err("zero capacity rejected");
        assert!(matches!(err, ConfigError::InvalidCacheCapacity { .. }));

        env::set_var("APP_REPORT_CACHE_CAPACITY", "64");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.report_cache_capacity, 64);
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_provider_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PROVIDER_TIMEOUT_MS", "0");
        let err = AppConfig::load().expect_err("zero timeout rejected");
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
        reset_env();
    }

    #[test]
    fn reads_engine_paths() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RULEBOOK_PATH", "/etc/parcel-ai/rules.json");
        env::set_var("APP_ASSESSMENT_CSV", "  ");
        env::set_var("APP_PROPERTY_JSON", "/etc/parcel-ai/parcels.json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.engine.rulebook_path,
            Some(PathBuf::from("/etc/parcel-ai/rules.json"))
        );
        assert!(config.engine.assessment_csv.is_none());
        assert_eq!(
            config.engine.property_json,
            Some(PathBuf::from("/etc/parcel-ai/parcels.json"))
        );
        reset_env();
    }
}
