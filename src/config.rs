use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub websocket: WebSocketConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Connections with no activity for this long are evicted by the monitor
    pub idle_timeout_secs: u64,
    /// Health monitor sweep period
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// UTC hour (0-23) for the daily visit reminder run
    pub reminder_hour: u32,
    /// UTC hour for the daily subscription expiry run
    pub expiry_hour: u32,
    /// UTC hour for the daily attendance alert run
    pub attendance_hour: u32,
    /// Cadence of the pending payment reminder run
    pub payment_interval_hours: u64,
    /// UTC hour for the weekly performance alert run (runs every 7 days)
    pub performance_hour: u32,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, AppError> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::Config(format!("invalid value for {}", key)))
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: env_parse("APP_PORT", "8000")?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| AppError::Config("DATABASE_URL is required".to_string()))?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET")
                    .map_err(|_| AppError::Config("JWT_SECRET is required".to_string()))?,
            },
            websocket: WebSocketConfig {
                idle_timeout_secs: env_parse("WS_IDLE_TIMEOUT_SECS", "300")?,
                sweep_interval_secs: env_parse("WS_SWEEP_INTERVAL_SECS", "60")?,
            },
            scheduler: SchedulerConfig {
                reminder_hour: env_parse("VISIT_REMINDER_HOUR", "18")?,
                expiry_hour: env_parse("SUBSCRIPTION_EXPIRY_HOUR", "9")?,
                attendance_hour: env_parse("ATTENDANCE_ALERT_HOUR", "10")?,
                payment_interval_hours: env_parse("PAYMENT_REMINDER_INTERVAL_HOURS", "6")?,
                performance_hour: env_parse("PERFORMANCE_ALERT_HOUR", "8")?,
            },
        })
    }
}
