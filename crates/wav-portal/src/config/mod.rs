use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_WIZARD_TTL_SECS: u64 = 60 * 60;

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

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub registration: RegistrationConfig,
    /// Remote backend endpoint; `None` runs the portal against the in-memory backend.
    pub backend: Option<BackendConfig>,
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

        let wizard_ttl = match non_blank_var("APP_WIZARD_TTL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidWizardTtl { value }),
            },
            None => Duration::from_secs(DEFAULT_WIZARD_TTL_SECS),
        };

        let backend = BackendConfig::from_parts(
            non_blank_var("BACKEND_URL"),
            non_blank_var("BACKEND_ANON_KEY"),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            registration: RegistrationConfig { wizard_ttl },
            backend,
        })
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Registration wizard housekeeping.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Idle time after which an unfinished wizard is dropped.
    pub wizard_ttl: Duration,
}

/// Endpoint and public key used to construct the backend client.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    fn from_parts(
        url: Option<String>,
        anon_key: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidBackendUrl { value: url });
                }
                Ok(Some(Self {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                }))
            }
            (Some(_), None) => Err(ConfigError::IncompleteBackend {
                missing: "BACKEND_ANON_KEY",
            }),
            (None, Some(_)) => Err(ConfigError::IncompleteBackend {
                missing: "BACKEND_URL",
            }),
        }
    }
}

// The anon key is public-facing but still kept out of logs.
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBackendUrl { value: String },
    IncompleteBackend { missing: &'static str },
    InvalidWizardTtl { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBackendUrl { value } => {
                write!(f, "BACKEND_URL must be an http(s) URL, found '{value}'")
            }
            ConfigError::IncompleteBackend { missing } => {
                write!(
                    f,
                    "BACKEND_URL and BACKEND_ANON_KEY must be set together ({missing} is missing)"
                )
            }
            ConfigError::InvalidWizardTtl { value } => {
                write!(
                    f,
                    "APP_WIZARD_TTL_SECS must be a positive number of seconds, found '{value}'"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidBackendUrl { .. }
            | ConfigError::IncompleteBackend { .. }
            | ConfigError::InvalidWizardTtl { .. } => None,
        }
    }
}

/// Serialises tests that touch process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
