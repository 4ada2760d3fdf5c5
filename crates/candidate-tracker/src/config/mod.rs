use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::export::FormatLimits;

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
    pub export: ExportConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            export: ExportConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Row ceilings per format, artifact lifetime and worker pool sizing for exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub csv_max: u32,
    pub excel_max: u32,
    pub pdf_max: u32,
    pub expiration_minutes: u32,
    pub sweep_interval_secs: u32,
    pub max_concurrent_exports: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_max: 100_000,
            excel_max: 200_000,
            pdf_max: 5_000,
            expiration_minutes: 10,
            sweep_interval_secs: 30,
            max_concurrent_exports: 4,
        }
    }
}

impl ExportConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            csv_max: positive_var("EXPORT_MAX_CSV", defaults.csv_max)?,
            excel_max: positive_var("EXPORT_MAX_EXCEL", defaults.excel_max)?,
            pdf_max: positive_var("EXPORT_MAX_PDF", defaults.pdf_max)?,
            expiration_minutes: positive_var(
                "EXPORT_EXPIRATION_MINUTES",
                defaults.expiration_minutes,
            )?,
            sweep_interval_secs: positive_var(
                "EXPORT_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
            max_concurrent_exports: positive_var(
                "EXPORT_MAX_CONCURRENT",
                defaults.max_concurrent_exports,
            )?,
        })
    }

    pub fn limits(&self) -> FormatLimits {
        FormatLimits {
            csv_max: self.csv_max as usize,
            excel_max: self.excel_max as usize,
            pdf_max: self.pdf_max as usize,
            expiration_minutes: self.expiration_minutes,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.sweep_interval_secs))
    }
}

fn positive_var(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidExportSetting { name, value: raw }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidExportSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidExportSetting { name, value } => {
                write!(f, "{name} must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidExportSetting { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
