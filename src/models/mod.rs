//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod attendee;
pub mod audit;
pub mod event;
pub mod membership;
pub mod notification;
pub mod registration;
pub mod scholarship;

// Re-export commonly used models
pub use attendee::{Attendee, CreateAttendeeRequest};
pub use audit::{actions as audit_actions, AuditLogEntry, NewAuditEntry};
pub use event::{
    CreateEventRequest, Event, EventStatus, PricingModel, UpdateEventRequest,
    DEFAULT_MIN_DONATION_CENTS,
};
pub use membership::{CreateMembershipRequest, Membership};
pub use notification::{
    BatchOutcome, BatchStatus, DeliveryStatus, NewNotificationLogEntry, NotificationBatch,
    NotificationChannel, NotificationLogEntry,
};
pub use registration::{
    AccommodationType, CreateRegistrationRequest, Registration, RegistrationSource,
    RegistrationStatus, UpdateRegistrationRequest,
};
pub use scholarship::{CreateScholarshipLinkRequest, ScholarshipLink};
