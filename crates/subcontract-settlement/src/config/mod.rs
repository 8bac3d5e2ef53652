use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

pub const DEFAULT_NARRATION_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_NARRATION_MODEL: &str = "gemini-3-pro-preview";

/// Top-level configuration for the settlement service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub narration: NarrationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            narration: NarrationConfig::from_env()?,
        })
    }
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Connection details for the text-generation endpoint backing risk audits.
///
/// A missing API key disables narration; the service then answers every audit
/// request with the static fallback message.
#[derive(Clone)]
pub struct NarrationConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl NarrationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("NARRATION_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let endpoint = env::var("NARRATION_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_NARRATION_ENDPOINT.to_string());
        let model =
            env::var("NARRATION_MODEL").unwrap_or_else(|_| DEFAULT_NARRATION_MODEL.to_string());
        let timeout_secs = env::var("NARRATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidNarrationTimeout)?;

        Ok(Self {
            api_key,
            endpoint,
            model,
            timeout_secs,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_NARRATION_ENDPOINT.to_string(),
            model: DEFAULT_NARRATION_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for NarrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("NARRATION_TIMEOUT_SECS must be a positive number of seconds")]
    InvalidNarrationTimeout,
}
