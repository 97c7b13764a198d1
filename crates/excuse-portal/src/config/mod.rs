use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the portal.
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

const DEFAULT_EMAIL_DOMAIN: &str = "bmc.edu.sa";
const DEFAULT_CACHE_PATH: &str = ".excuse-portal/form-data.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 10 * 60;
const DEFAULT_ADMIN_PAGE_SIZE: usize = 8;
const DEFAULT_STUDENT_PAGE_SIZE: usize = 7;

/// Top-level configuration for the portal client and the local stub backend.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub listing: ListingConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let endpoint = env::var("PORTAL_ENDPOINT_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let email_domain = env::var("PORTAL_EMAIL_DOMAIN")
            .unwrap_or_else(|_| DEFAULT_EMAIL_DOMAIN.to_string())
            .trim()
            .trim_start_matches('@')
            .to_ascii_lowercase();

        let cache_path = env::var("PORTAL_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_PATH));
        let ttl_secs = match env::var("PORTAL_CACHE_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidCacheTtl)?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        let admin_page_size = page_size_from_env("PORTAL_ADMIN_PAGE_SIZE", DEFAULT_ADMIN_PAGE_SIZE)?;
        let student_page_size =
            page_size_from_env("PORTAL_STUDENT_PAGE_SIZE", DEFAULT_STUDENT_PAGE_SIZE)?;

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            backend: BackendConfig { endpoint },
            auth: AuthConfig { email_domain },
            cache: CacheConfig {
                path: cache_path,
                ttl: Duration::from_secs(ttl_secs),
            },
            listing: ListingConfig {
                admin_page_size,
                student_page_size,
            },
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn page_size_from_env(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(ConfigError::InvalidPageSize { key }),
        },
        Err(_) => Ok(default),
    }
}

/// Location of the single action endpoint.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub endpoint: Option<String>,
}

impl BackendConfig {
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
        }
    }

    /// The endpoint is only required once a remote call is attempted.
    pub fn endpoint(&self) -> Result<reqwest::Url, ConfigError> {
        let raw = self
            .endpoint
            .as_deref()
            .ok_or(ConfigError::MissingEndpoint)?;

        let url = reqwest::Url::parse(raw).map_err(|_| ConfigError::InvalidEndpoint {
            value: raw.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::InvalidEndpoint {
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub email_domain: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
        }
    }
}

/// Local persisted cache of form lookups.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ListingConfig {
    pub admin_page_size: usize,
    pub student_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            admin_page_size: DEFAULT_ADMIN_PAGE_SIZE,
            student_page_size: DEFAULT_STUDENT_PAGE_SIZE,
        }
    }
}

/// Settings controlling the stub backend binding.
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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingEndpoint,
    InvalidEndpoint { value: String },
    InvalidCacheTtl,
    InvalidPageSize { key: &'static str },
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEndpoint => {
                write!(f, "PORTAL_ENDPOINT_URL is not set; the portal has no backend")
            }
            ConfigError::InvalidEndpoint { value } => {
                write!(f, "PORTAL_ENDPOINT_URL '{value}' is not an http(s) URL")
            }
            ConfigError::InvalidCacheTtl => {
                write!(f, "PORTAL_CACHE_TTL_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidPageSize { key } => {
                write!(f, "{key} must be a positive integer")
            }
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PORTAL_ENDPOINT_URL",
            "PORTAL_EMAIL_DOMAIN",
            "PORTAL_CACHE_PATH",
            "PORTAL_CACHE_TTL_SECS",
            "PORTAL_ADMIN_PAGE_SIZE",
            "PORTAL_STUDENT_PAGE_SIZE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert!(config.backend.endpoint.is_none());
        assert_eq!(config.auth.email_domain, "bmc.edu.sa");
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert_eq!(config.listing.admin_page_size, 8);
        assert_eq!(config.listing.student_page_size, 7);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn missing_endpoint_is_reported_lazily() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads without endpoint");
        assert!(matches!(
            config.backend.endpoint(),
            Err(ConfigError::MissingEndpoint)
        ));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let backend = BackendConfig::for_endpoint("ftp://portal.example/exec");
        assert!(matches!(
            backend.endpoint(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));

        let backend = BackendConfig::for_endpoint("https://portal.example/exec");
        assert_eq!(
            backend.endpoint().expect("valid endpoint").host_str(),
            Some("portal.example")
        );
    }

    #[test]
    fn rejects_zero_page_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_ADMIN_PAGE_SIZE", "0");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPageSize {
                key: "PORTAL_ADMIN_PAGE_SIZE"
            })
        ));
    }

    #[test]
    fn strips_leading_at_from_email_domain() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_EMAIL_DOMAIN", "@Example.EDU");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        assert_eq!(config.auth.email_domain, "example.edu");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        reset_env();
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
