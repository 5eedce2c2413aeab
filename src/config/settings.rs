//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub organization_name: String,
    /// Base URL used when rendering attendee-facing links.
    pub base_url: String,
}

/// Storage backend selection. Chosen once at startup; business logic never
/// branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    Postgres,
    /// In-memory fixture-backed repositories, for demos and tests.
    Fixture,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Expiry/reminder sweep configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    pub sweep_interval_seconds: u64,
}

/// Bulk dispatcher and transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Message gateway webhook the production transport POSTs to.
    pub gateway_url: String,
    /// Per-recipient send timeout; a timeout counts as a failed send.
    pub send_timeout_seconds: u64,
    /// How long an idempotency key deduplicates retried bulk sends.
    pub dedup_window_hours: i64,
    /// Pause between recipient sends to stay under provider rate limits.
    pub throttle_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("RETREAT_OPS").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::OpsError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppConfig {
                organization_name: "Retreat Ops".to_string(),
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                url: "postgresql://localhost/retreat_ops".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            scheduler: SchedulerConfig {
                sweep_interval_seconds: 300,
            },
            notifications: NotificationConfig {
                gateway_url: "http://localhost:9000/send".to_string(),
                send_timeout_seconds: 10,
                dedup_window_hours: 24,
                throttle_ms: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "./logs".to_string(),
            },
        }
    }
}
