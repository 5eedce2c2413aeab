//! Repository abstractions
//!
//! Every entity is accessed through an object-safe trait with two
//! implementations: a Postgres backend and an in-memory fixture backend.
//! The backend is selected once at startup from configuration; business
//! logic holds `Arc<dyn …>` handles and never knows which one it got.
//!
//! Operations that must be atomic with their audit entry (status
//! transitions, check-in, operator edits) take the `NewAuditEntry` as an
//! argument so each backend can commit both in one unit of work.

pub mod attendee;
pub mod audit;
pub mod event;
pub mod membership;
pub mod memory;
pub mod notification;
pub mod registration;
pub mod scholarship;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::database::connection::DatabasePool;
use crate::models::{
    Attendee, AuditLogEntry, CreateAttendeeRequest, CreateEventRequest,
    CreateMembershipRequest, CreateRegistrationRequest, CreateScholarshipLinkRequest, Event,
    EventStatus, Membership, NewAuditEntry, NewNotificationLogEntry, NotificationBatch,
    NotificationChannel, NotificationLogEntry, Registration, RegistrationStatus,
    ScholarshipLink, UpdateEventRequest, UpdateRegistrationRequest,
};
use crate::utils::errors::Result;

pub use attendee::PgAttendeeRepository;
pub use audit::PgAuditLogRepository;
pub use event::PgEventRepository;
pub use membership::PgMembershipRepository;
pub use memory::FixtureStore;
pub use notification::PgNotificationRepository;
pub use registration::PgRegistrationRepository;
pub use scholarship::PgScholarshipRepository;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, request: CreateEventRequest) -> Result<Event>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>>;
    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Event>;
    async fn list_by_status(&self, status: EventStatus) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait AttendeeRepository: Send + Sync {
    async fn create(&self, request: CreateAttendeeRequest) -> Result<Attendee>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendee>>;
    /// Lookup by normalized email, the directory key.
    async fn find_by_email(&self, email: &str) -> Result<Option<Attendee>>;
    async fn update_contact(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
        phone: Option<String>,
    ) -> Result<Attendee>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Create a registration and its audit entry in one unit of work. The
    /// audit entry's `entity_id` is replaced with the created id.
    async fn create(
        &self,
        request: CreateRegistrationRequest,
        audit: NewAuditEntry,
    ) -> Result<Registration>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>>;

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Registration>>;

    async fn list_by_event_and_statuses(
        &self,
        event_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<Registration>>;

    /// All registrations in the given status, across every event. The sweep
    /// scopes itself by registration status alone, so an event leaving
    /// `active` never strands its pending registrations.
    async fn list_by_status(&self, status: RegistrationStatus) -> Result<Vec<Registration>>;

    /// A pending or complete registration for this attendee/event pair,
    /// used for the duplicate-submission guard.
    async fn find_active_for_attendee(
        &self,
        event_id: Uuid,
        attendee_id: Uuid,
    ) -> Result<Option<Registration>>;

    /// Pending + complete registrations count toward capacity.
    async fn count_toward_capacity(&self, event_id: Uuid) -> Result<i64>;

    /// Compare-and-set status transition. Fails with `InvalidTransition`
    /// when the current status no longer matches `expected`, without
    /// mutating anything. The audit entry commits with the update.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        target: RegistrationStatus,
        payment_amount_cents: Option<i64>,
        audit: NewAuditEntry,
    ) -> Result<Registration>;

    /// Operator edit of non-status fields, audited.
    async fn update_details(
        &self,
        id: Uuid,
        request: UpdateRegistrationRequest,
        audit: NewAuditEntry,
    ) -> Result<Registration>;

    /// Record physical check-in. Guarded on status `complete`; fails with
    /// `NotEligible` otherwise. Last write wins on the timestamp.
    async fn set_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        operator: &str,
        audit: NewAuditEntry,
    ) -> Result<Registration>;

    /// Reverse a check-in. Fails with `NotCheckedIn` when the registration
    /// was never checked in.
    async fn clear_check_in(&self, id: Uuid, audit: NewAuditEntry) -> Result<Registration>;

    /// Claim the one payment reminder for this registration. Returns true
    /// for the caller that won the claim; false when already claimed.
    async fn claim_reminder(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Create a membership, deactivating any prior active membership for
    /// the attendee in the same unit of work.
    async fn create(
        &self,
        request: CreateMembershipRequest,
        audit: NewAuditEntry,
    ) -> Result<Membership>;

    async fn find_active_for_attendee(&self, attendee_id: Uuid) -> Result<Option<Membership>>;
    async fn list_for_attendee(&self, attendee_id: Uuid) -> Result<Vec<Membership>>;
    async fn deactivate(&self, id: Uuid, audit: NewAuditEntry) -> Result<Membership>;
}

#[async_trait]
pub trait ScholarshipRepository: Send + Sync {
    async fn create(
        &self,
        request: CreateScholarshipLinkRequest,
        audit: NewAuditEntry,
    ) -> Result<ScholarshipLink>;

    async fn find_by_code(&self, code: &str) -> Result<Option<ScholarshipLink>>;
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<ScholarshipLink>>;

    /// Atomic increment-if-under-limit. Fails with `ScholarshipExhausted`
    /// when no uses remain or the code was deactivated; concurrent
    /// redemptions can never push `uses` past `max_uses`.
    async fn redeem(&self, code: &str) -> Result<ScholarshipLink>;

    async fn deactivate(&self, id: Uuid, audit: NewAuditEntry) -> Result<ScholarshipLink>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append-only; there is no update or delete.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry>;

    /// Entries for one entity, newest first.
    async fn list_for_entity(&self, entity_id: Uuid, limit: i64) -> Result<Vec<AuditLogEntry>>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>>;
}

/// Result of claiming an idempotency key for a bulk send.
#[derive(Debug, Clone)]
pub enum BatchBegin {
    /// This caller owns the key; it should dispatch and then record the
    /// outcome with `complete_batch`.
    Started,
    /// Another call already claimed the key inside the dedup window.
    Duplicate(NotificationBatch),
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// First-writer-wins claim of an idempotency key. A key older than the
    /// dedup window is treated as absent and replaced.
    async fn try_begin_batch(
        &self,
        key: &str,
        event_id: Uuid,
        channel: NotificationChannel,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<BatchBegin>;

    async fn complete_batch(&self, key: &str, sent_count: i32, failed_count: i32) -> Result<()>;

    async fn append_log(&self, entry: NewNotificationLogEntry) -> Result<NotificationLogEntry>;

    /// Send log for an event's registrations, newest first.
    async fn list_log_for_event(
        &self,
        event_id: Uuid,
        limit: i64,
    ) -> Result<Vec<NotificationLogEntry>>;

    /// Drop batch records older than the cutoff. Returns how many were
    /// purged.
    async fn purge_batches_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Aggregate of all repository handles, injected into the service layer.
#[derive(Clone)]
pub struct Repositories {
    pub events: Arc<dyn EventRepository>,
    pub attendees: Arc<dyn AttendeeRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub scholarships: Arc<dyn ScholarshipRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// Postgres-backed repositories sharing one connection pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            events: Arc::new(PgEventRepository::new(pool.clone())),
            attendees: Arc::new(PgAttendeeRepository::new(pool.clone())),
            registrations: Arc::new(PgRegistrationRepository::new(pool.clone())),
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            scholarships: Arc::new(PgScholarshipRepository::new(pool.clone())),
            audit: Arc::new(PgAuditLogRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        }
    }

    /// Fixture-backed repositories over one shared in-memory store.
    pub fn fixture() -> Self {
        let store = FixtureStore::new();
        Self {
            events: Arc::new(store.clone()),
            attendees: Arc::new(store.clone()),
            registrations: Arc::new(store.clone()),
            memberships: Arc::new(store.clone()),
            scholarships: Arc::new(store.clone()),
            audit: Arc::new(store.clone()),
            notifications: Arc::new(store),
        }
    }
}
