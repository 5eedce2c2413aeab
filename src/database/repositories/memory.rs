//! In-memory fixture backend
//!
//! A single `FixtureStore` implements every repository trait over one shared
//! mutex-guarded state, so a mutation and its audit entry commit under the
//! same lock just as the Postgres backend commits them in one transaction.
//! Selected via `database.backend = "fixture"` for demos and tests; nothing
//! persists past the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::repositories::{
    AttendeeRepository, AuditLogRepository, BatchBegin, EventRepository, MembershipRepository,
    NotificationRepository, RegistrationRepository, ScholarshipRepository,
};
use crate::models::{
    Attendee, AuditLogEntry, BatchStatus, CreateAttendeeRequest, CreateEventRequest,
    CreateMembershipRequest, CreateRegistrationRequest, CreateScholarshipLinkRequest, Event,
    EventStatus, Membership, NewAuditEntry, NewNotificationLogEntry, NotificationBatch,
    NotificationChannel, NotificationLogEntry, Registration, RegistrationStatus,
    ScholarshipLink, UpdateEventRequest, UpdateRegistrationRequest,
};
use crate::utils::errors::{OpsError, Result};
use crate::utils::helpers::generate_scholarship_code;

#[derive(Default)]
struct FixtureState {
    events: HashMap<Uuid, Event>,
    attendees: HashMap<Uuid, Attendee>,
    registrations: HashMap<Uuid, Registration>,
    memberships: HashMap<Uuid, Membership>,
    scholarships: HashMap<Uuid, ScholarshipLink>,
    audit_log: Vec<AuditLogEntry>,
    batches: HashMap<String, NotificationBatch>,
    notification_log: Vec<NotificationLogEntry>,
}

impl FixtureState {
    fn push_audit(&mut self, entry: NewAuditEntry) -> AuditLogEntry {
        let logged = AuditLogEntry {
            id: Uuid::new_v4(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action: entry.action,
            actor: entry.actor,
            old_value: entry.old_value,
            new_value: entry.new_value,
            timestamp: Utc::now(),
        };
        self.audit_log.push(logged.clone());
        logged
    }
}

#[derive(Clone, Default)]
pub struct FixtureStore {
    state: Arc<Mutex<FixtureState>>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        // A panicked holder leaves consistent state; keep serving.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventRepository for FixtureStore {
    async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let mut state = self.lock();
        if state.events.values().any(|e| e.slug == request.slug) {
            return Err(OpsError::InvalidInput(format!(
                "event slug already exists: {}",
                request.slug
            )));
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            name: request.name,
            slug: request.slug,
            description: request.description,
            event_date: request.event_date,
            pricing_model: request.pricing_model,
            fixed_price_cents: request.fixed_price_cents,
            min_donation_cents: request.min_donation_cents,
            capacity: request.capacity,
            reminder_delay_minutes: request.reminder_delay_minutes,
            auto_expire_hours: request.auto_expire_hours,
            status: EventStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        Ok(self.lock().events.values().find(|e| e.slug == slug).cloned())
    }

    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        let mut state = self.lock();
        let event = state
            .events
            .get_mut(&id)
            .ok_or(OpsError::EventNotFound { event_id: id })?;

        if let Some(name) = request.name {
            event.name = name;
        }
        if let Some(description) = request.description {
            event.description = description;
        }
        if let Some(event_date) = request.event_date {
            event.event_date = event_date;
        }
        if let Some(fixed_price_cents) = request.fixed_price_cents {
            event.fixed_price_cents = fixed_price_cents;
        }
        if let Some(min_donation_cents) = request.min_donation_cents {
            event.min_donation_cents = min_donation_cents;
        }
        if let Some(capacity) = request.capacity {
            event.capacity = capacity;
        }
        if let Some(reminder_delay_minutes) = request.reminder_delay_minutes {
            event.reminder_delay_minutes = reminder_delay_minutes;
        }
        if let Some(auto_expire_hours) = request.auto_expire_hours {
            event.auto_expire_hours = auto_expire_hours;
        }
        if let Some(status) = request.status {
            event.status = status;
        }
        event.updated_at = Utc::now();

        Ok(event.clone())
    }

    async fn list_by_status(&self, status: EventStatus) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .lock()
            .events
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }
}

#[async_trait]
impl AttendeeRepository for FixtureStore {
    async fn create(&self, request: CreateAttendeeRequest) -> Result<Attendee> {
        let mut state = self.lock();
        if state.attendees.values().any(|a| a.email == request.email) {
            return Err(OpsError::InvalidInput(format!(
                "attendee email already exists: {}",
                request.email
            )));
        }

        let now = Utc::now();
        let attendee = Attendee {
            id: Uuid::new_v4(),
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            created_at: now,
            updated_at: now,
        };
        state.attendees.insert(attendee.id, attendee.clone());
        Ok(attendee)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendee>> {
        Ok(self.lock().attendees.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Attendee>> {
        Ok(self
            .lock()
            .attendees
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
        phone: Option<String>,
    ) -> Result<Attendee> {
        let mut state = self.lock();
        let attendee = state
            .attendees
            .get_mut(&id)
            .ok_or(OpsError::AttendeeNotFound { attendee_id: id })?;

        attendee.first_name = first_name.to_string();
        attendee.last_name = last_name.to_string();
        attendee.phone = phone;
        attendee.updated_at = Utc::now();
        Ok(attendee.clone())
    }
}

#[async_trait]
impl RegistrationRepository for FixtureStore {
    async fn create(
        &self,
        request: CreateRegistrationRequest,
        audit: NewAuditEntry,
    ) -> Result<Registration> {
        let mut state = self.lock();
        let now = Utc::now();
        let registration = Registration {
            id: Uuid::new_v4(),
            event_id: request.event_id,
            attendee_id: request.attendee_id,
            status: request.status,
            amount_due_cents: request.amount_due_cents,
            payment_amount_cents: request.payment_amount_cents,
            accommodation_type: request.accommodation_type,
            dietary_restrictions: request.dietary_restrictions,
            source: request.source,
            notes: request.notes,
            cancellation_requested: false,
            member_discount_applied: request.member_discount_applied,
            reminder_sent_at: None,
            checked_in_at: None,
            checked_in_by: None,
            created_at: now,
            updated_at: now,
        };
        state.registrations.insert(registration.id, registration.clone());
        let mut audit = audit;
        audit.entity_id = registration.id;
        state.push_audit(audit);
        Ok(registration)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>> {
        Ok(self.lock().registrations.get(&id).cloned())
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let mut registrations: Vec<Registration> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.created_at);
        Ok(registrations)
    }

    async fn list_by_event_and_statuses(
        &self,
        event_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<Registration>> {
        let mut registrations: Vec<Registration> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && statuses.contains(&r.status))
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.created_at);
        Ok(registrations)
    }

    async fn list_by_status(&self, status: RegistrationStatus) -> Result<Vec<Registration>> {
        let mut registrations: Vec<Registration> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.created_at);
        Ok(registrations)
    }

    async fn find_active_for_attendee(
        &self,
        event_id: Uuid,
        attendee_id: Uuid,
    ) -> Result<Option<Registration>> {
        Ok(self
            .lock()
            .registrations
            .values()
            .find(|r| {
                r.event_id == event_id
                    && r.attendee_id == attendee_id
                    && matches!(
                        r.status,
                        RegistrationStatus::PendingPayment | RegistrationStatus::Complete
                    )
            })
            .cloned())
    }

    async fn count_toward_capacity(&self, event_id: Uuid) -> Result<i64> {
        Ok(self
            .lock()
            .registrations
            .values()
            .filter(|r| {
                r.event_id == event_id
                    && matches!(
                        r.status,
                        RegistrationStatus::PendingPayment | RegistrationStatus::Complete
                    )
            })
            .count() as i64)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        target: RegistrationStatus,
        payment_amount_cents: Option<i64>,
        audit: NewAuditEntry,
    ) -> Result<Registration> {
        let mut state = self.lock();
        let current_status = state
            .registrations
            .get(&id)
            .map(|r| r.status)
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;

        if current_status != expected {
            return Err(OpsError::InvalidTransition {
                from: current_status.to_string(),
                to: target.to_string(),
            });
        }

        let registration = state
            .registrations
            .get_mut(&id)
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;
        registration.status = target;
        if payment_amount_cents.is_some() {
            registration.payment_amount_cents = payment_amount_cents;
        }
        registration.updated_at = Utc::now();
        let registration = registration.clone();

        state.push_audit(audit);
        Ok(registration)
    }

    async fn update_details(
        &self,
        id: Uuid,
        request: UpdateRegistrationRequest,
        audit: NewAuditEntry,
    ) -> Result<Registration> {
        let mut state = self.lock();
        let registration = state
            .registrations
            .get_mut(&id)
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;

        if let Some(accommodation_type) = request.accommodation_type {
            registration.accommodation_type = accommodation_type;
        }
        if let Some(dietary_restrictions) = request.dietary_restrictions {
            registration.dietary_restrictions = dietary_restrictions;
        }
        if let Some(notes) = request.notes {
            registration.notes = notes;
        }
        if let Some(cancellation_requested) = request.cancellation_requested {
            registration.cancellation_requested = cancellation_requested;
        }
        registration.updated_at = Utc::now();
        let registration = registration.clone();

        state.push_audit(audit);
        Ok(registration)
    }

    async fn set_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        operator: &str,
        audit: NewAuditEntry,
    ) -> Result<Registration> {
        let mut state = self.lock();
        let registration = state
            .registrations
            .get_mut(&id)
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;

        if registration.status != RegistrationStatus::Complete {
            return Err(OpsError::NotEligible {
                registration_id: id,
            });
        }

        registration.checked_in_at = Some(at);
        registration.checked_in_by = Some(operator.to_string());
        registration.updated_at = Utc::now();
        let registration = registration.clone();

        state.push_audit(audit);
        Ok(registration)
    }

    async fn clear_check_in(&self, id: Uuid, audit: NewAuditEntry) -> Result<Registration> {
        let mut state = self.lock();
        let registration = state
            .registrations
            .get_mut(&id)
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;

        if registration.checked_in_at.is_none() {
            return Err(OpsError::NotCheckedIn {
                registration_id: id,
            });
        }

        registration.checked_in_at = None;
        registration.checked_in_by = None;
        registration.updated_at = Utc::now();
        let registration = registration.clone();

        state.push_audit(audit);
        Ok(registration)
    }

    async fn claim_reminder(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock();
        match state.registrations.get_mut(&id) {
            Some(registration)
                if registration.status == RegistrationStatus::PendingPayment
                    && registration.reminder_sent_at.is_none() =>
            {
                registration.reminder_sent_at = Some(at);
                registration.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl MembershipRepository for FixtureStore {
    async fn create(
        &self,
        request: CreateMembershipRequest,
        audit: NewAuditEntry,
    ) -> Result<Membership> {
        let mut state = self.lock();
        for membership in state.memberships.values_mut() {
            if membership.attendee_id == request.attendee_id && membership.is_active {
                membership.is_active = false;
            }
        }

        let now = Utc::now();
        let membership = Membership {
            id: Uuid::new_v4(),
            attendee_id: request.attendee_id,
            discount_value_cents: request.discount_value_cents,
            is_active: true,
            started_at: now,
            created_at: now,
        };
        state.memberships.insert(membership.id, membership.clone());
        let mut audit = audit;
        audit.entity_id = membership.id;
        state.push_audit(audit);
        Ok(membership)
    }

    async fn find_active_for_attendee(&self, attendee_id: Uuid) -> Result<Option<Membership>> {
        Ok(self
            .lock()
            .memberships
            .values()
            .filter(|m| m.attendee_id == attendee_id && m.is_active)
            .max_by_key(|m| m.started_at)
            .cloned())
    }

    async fn list_for_attendee(&self, attendee_id: Uuid) -> Result<Vec<Membership>> {
        let mut memberships: Vec<Membership> = self
            .lock()
            .memberships
            .values()
            .filter(|m| m.attendee_id == attendee_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(memberships)
    }

    async fn deactivate(&self, id: Uuid, audit: NewAuditEntry) -> Result<Membership> {
        let mut state = self.lock();
        let membership = state
            .memberships
            .get_mut(&id)
            .ok_or_else(|| OpsError::InvalidInput(format!("membership not found: {id}")))?;
        membership.is_active = false;
        let membership = membership.clone();

        state.push_audit(audit);
        Ok(membership)
    }
}

#[async_trait]
impl ScholarshipRepository for FixtureStore {
    async fn create(
        &self,
        request: CreateScholarshipLinkRequest,
        audit: NewAuditEntry,
    ) -> Result<ScholarshipLink> {
        let mut state = self.lock();
        let code = request.code.unwrap_or_else(generate_scholarship_code);
        if state.scholarships.values().any(|s| s.code == code) {
            return Err(OpsError::InvalidInput(format!(
                "scholarship code already exists: {code}"
            )));
        }

        let link = ScholarshipLink {
            id: Uuid::new_v4(),
            event_id: request.event_id,
            code,
            override_price_cents: request.override_price_cents,
            max_uses: request.max_uses,
            uses: 0,
            active: true,
            created_at: Utc::now(),
        };
        state.scholarships.insert(link.id, link.clone());
        let mut audit = audit;
        audit.entity_id = link.id;
        state.push_audit(audit);
        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ScholarshipLink>> {
        Ok(self
            .lock()
            .scholarships
            .values()
            .find(|s| s.code == code)
            .cloned())
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<ScholarshipLink>> {
        let mut links: Vec<ScholarshipLink> = self
            .lock()
            .scholarships
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        links.sort_by_key(|s| s.created_at);
        Ok(links)
    }

    async fn redeem(&self, code: &str) -> Result<ScholarshipLink> {
        let mut state = self.lock();
        let link = state
            .scholarships
            .values_mut()
            .find(|s| s.code == code)
            .ok_or_else(|| OpsError::ScholarshipInvalid {
                code: code.to_string(),
            })?;

        if !link.has_remaining_uses() {
            return Err(OpsError::ScholarshipExhausted {
                code: code.to_string(),
            });
        }

        link.uses += 1;
        Ok(link.clone())
    }

    async fn deactivate(&self, id: Uuid, audit: NewAuditEntry) -> Result<ScholarshipLink> {
        let mut state = self.lock();
        let link = state
            .scholarships
            .get_mut(&id)
            .ok_or_else(|| OpsError::InvalidInput(format!("scholarship link not found: {id}")))?;
        link.active = false;
        let link = link.clone();

        state.push_audit(audit);
        Ok(link)
    }
}

#[async_trait]
impl AuditLogRepository for FixtureStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
        Ok(self.lock().push_audit(entry))
    }

    async fn list_for_entity(&self, entity_id: Uuid, limit: i64) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .lock()
            .audit_log
            .iter()
            .rev()
            .filter(|e| e.entity_id == entity_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .lock()
            .audit_log
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationRepository for FixtureStore {
    async fn try_begin_batch(
        &self,
        key: &str,
        event_id: Uuid,
        channel: NotificationChannel,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<BatchBegin> {
        let mut state = self.lock();
        let cutoff = now - window;
        if state
            .batches
            .get(key)
            .is_some_and(|batch| batch.started_at < cutoff)
        {
            state.batches.remove(key);
        }

        if let Some(existing) = state.batches.get(key) {
            return Ok(BatchBegin::Duplicate(existing.clone()));
        }

        state.batches.insert(
            key.to_string(),
            NotificationBatch {
                idempotency_key: key.to_string(),
                event_id,
                channel,
                status: BatchStatus::InProgress,
                sent_count: 0,
                failed_count: 0,
                started_at: now,
            },
        );
        Ok(BatchBegin::Started)
    }

    async fn complete_batch(&self, key: &str, sent_count: i32, failed_count: i32) -> Result<()> {
        let mut state = self.lock();
        let batch = state
            .batches
            .get_mut(key)
            .ok_or_else(|| OpsError::InvalidInput(format!("notification batch not found: {key}")))?;
        batch.status = BatchStatus::Completed;
        batch.sent_count = sent_count;
        batch.failed_count = failed_count;
        Ok(())
    }

    async fn append_log(&self, entry: NewNotificationLogEntry) -> Result<NotificationLogEntry> {
        let mut state = self.lock();
        let logged = NotificationLogEntry {
            id: Uuid::new_v4(),
            registration_id: entry.registration_id,
            channel: entry.channel,
            template_key: entry.template_key,
            status: entry.status,
            sent_at: Utc::now(),
        };
        state.notification_log.push(logged.clone());
        Ok(logged)
    }

    async fn list_log_for_event(
        &self,
        event_id: Uuid,
        limit: i64,
    ) -> Result<Vec<NotificationLogEntry>> {
        let state = self.lock();
        let entries = state
            .notification_log
            .iter()
            .rev()
            .filter(|entry| {
                state
                    .registrations
                    .get(&entry.registration_id)
                    .is_some_and(|r| r.event_id == event_id)
            })
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(entries)
    }

    async fn purge_batches_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.lock();
        let before = state.batches.len();
        state.batches.retain(|_, batch| batch.started_at >= cutoff);
        Ok((before - state.batches.len()) as u64)
    }
}
