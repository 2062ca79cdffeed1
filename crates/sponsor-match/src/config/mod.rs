use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::workflows::sponsorship::MatchingConfig;

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
    pub matching: MatchingConfig,
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
            matching: load_matching_config()?,
        })
    }
}

const ALLOCATION_EXPIRY_DAYS: std::ops::RangeInclusive<i64> = 1..=3650;

fn load_matching_config() -> Result<MatchingConfig, ConfigError> {
    let defaults = MatchingConfig::default();

    let config = MatchingConfig {
        batch_size: env_or("MATCH_BATCH_SIZE", defaults.batch_size)?,
        max_matches_per_student: env_or("MATCH_MAX_PER_STUDENT", defaults.max_matches_per_student)?,
        min_score_threshold: env_or("MATCH_MIN_SCORE", defaults.min_score_threshold)?,
        auto_assign_enabled: env_flag("MATCH_AUTO_ASSIGN", defaults.auto_assign_enabled)?,
        max_students_per_sponsor: env_or(
            "MATCH_MAX_STUDENTS_PER_SPONSOR",
            defaults.max_students_per_sponsor,
        )?,
        notification_enabled: env_flag("MATCH_NOTIFICATIONS", defaults.notification_enabled)?,
        allocation_expiry_days: env_or(
            "MATCH_ALLOCATION_EXPIRY_DAYS",
            defaults.allocation_expiry_days,
        )?,
    };

    if config.batch_size == 0 {
        return Err(ConfigError::InvalidMatchingSetting {
            key: "MATCH_BATCH_SIZE",
            value: "0".to_string(),
        });
    }
    if !(0.0..=100.0).contains(&config.min_score_threshold) {
        return Err(ConfigError::InvalidMatchingSetting {
            key: "MATCH_MIN_SCORE",
            value: config.min_score_threshold.to_string(),
        });
    }

    if !ALLOCATION_EXPIRY_DAYS.contains(&config.allocation_expiry_days) {
        return Err(ConfigError::InvalidMatchingSetting {
            key: "MATCH_ALLOCATION_EXPIRY_DAYS",
            value: config.allocation_expiry_days.to_string(),
        });
    }

    Ok(config)
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidMatchingSetting { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidMatchingSetting { key, value: raw }),
        },
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMatchingSetting { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMatchingSetting { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidMatchingSetting { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
