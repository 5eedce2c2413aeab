//! Error handling for retreat-ops
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy. State-machine and pricing
//! violations are typed and specific; only the outer API layer may translate
//! them into generic messages.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for retreat-ops operations
#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Event not found for slug: {slug}")]
    EventSlugNotFound { slug: String },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: Uuid },

    #[error("Attendee not found: {attendee_id}")]
    AttendeeNotFound { attendee_id: Uuid },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Payment amount {received_cents} does not match recorded amount {recorded_cents}")]
    AmountMismatch {
        received_cents: i64,
        recorded_cents: i64,
    },

    #[error("Donation of {amount_cents} cents is below the event minimum of {minimum_cents}")]
    BelowMinimum {
        amount_cents: i64,
        minimum_cents: i64,
    },

    #[error("Scholarship code {code} has no remaining uses")]
    ScholarshipExhausted { code: String },

    #[error("Scholarship code not valid for this event: {code}")]
    ScholarshipInvalid { code: String },

    #[error("Registration {registration_id} is not eligible for check-in")]
    NotEligible { registration_id: Uuid },

    #[error("Registration {registration_id} has not been checked in")]
    NotCheckedIn { registration_id: Uuid },

    #[error("Attendee is already registered for this event")]
    DuplicateRegistration,

    #[error("Event is at capacity")]
    EventAtCapacity,

    #[error("Event is not open for registration: {slug}")]
    EventNotActive { slug: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for retreat-ops operations
pub type Result<T> = std::result::Result<T, OpsError>;

impl OpsError {
    /// Whether the error is a guard rejection of a single request rather
    /// than a system failure. Guard rejections are returned to the caller
    /// and never retried automatically.
    pub fn is_guard_rejection(&self) -> bool {
        matches!(
            self,
            OpsError::InvalidTransition { .. }
                | OpsError::AmountMismatch { .. }
                | OpsError::BelowMinimum { .. }
                | OpsError::ScholarshipExhausted { .. }
                | OpsError::ScholarshipInvalid { .. }
                | OpsError::NotEligible { .. }
                | OpsError::NotCheckedIn { .. }
                | OpsError::DuplicateRegistration
                | OpsError::EventAtCapacity
                | OpsError::EventNotActive { .. }
                | OpsError::InvalidInput(_)
        )
    }
}
