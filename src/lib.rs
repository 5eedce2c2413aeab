//! Retreat Ops
//!
//! Registration lifecycle and operations engine for ticketed and
//! donation-based retreat events: pricing and discount resolution, the
//! registration status state machine, the expiry/reminder scheduler, the
//! check-in ledger, dashboard aggregation, audit logging, and the
//! idempotent bulk notification dispatcher.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use database::Repositories;
pub use services::ServiceFactory;
pub use utils::errors::{OpsError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
