//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::{DatabaseBackend, Settings};
use crate::utils::errors::{OpsError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_scheduler_config(&settings.scheduler)?;
    validate_notification_config(&settings.notifications)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.backend == DatabaseBackend::Postgres && config.url.is_empty() {
        return Err(OpsError::Config(
            "Database URL is required for the postgres backend".to_string(),
        ));
    }

    if config.max_connections == 0 {
        return Err(OpsError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(OpsError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate scheduler configuration
fn validate_scheduler_config(config: &super::SchedulerConfig) -> Result<()> {
    if config.sweep_interval_seconds == 0 {
        return Err(OpsError::Config(
            "Sweep interval must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if config.gateway_url.is_empty() {
        return Err(OpsError::Config(
            "Notification gateway URL is required".to_string(),
        ));
    }

    if config.send_timeout_seconds == 0 {
        return Err(OpsError::Config(
            "Send timeout must be greater than 0".to_string(),
        ));
    }

    if config.dedup_window_hours <= 0 {
        return Err(OpsError::Config(
            "Dedup window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(OpsError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(OpsError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
