//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging
//! utilities for the retreat-ops engine.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard must be held for the lifetime of the process, or the
/// file appender stops flushing.
pub fn init_logging(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "retreat-ops.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a registration lifecycle action with structured data
pub fn log_registration_action(registration_id: Uuid, action: &str, actor: &str) {
    info!(
        registration_id = %registration_id,
        action = action,
        actor = actor,
        "Registration action performed"
    );
}

/// Log the outcome of one scheduler sweep
pub fn log_sweep_result(reminders_sent: usize, expired: usize, batches_purged: u64) {
    if reminders_sent == 0 && expired == 0 && batches_purged == 0 {
        debug!("Sweep completed with no actions");
    } else {
        info!(
            reminders_sent = reminders_sent,
            expired = expired,
            batches_purged = batches_purged,
            "Sweep completed"
        );
    }
}

/// Log a transition that lost a race and was rejected by the status guard
pub fn log_transition_rejected(registration_id: Uuid, from: &str, to: &str) {
    warn!(
        registration_id = %registration_id,
        from = from,
        to = to,
        "Status transition rejected by guard"
    );
}
