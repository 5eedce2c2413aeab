//! Registration lifecycle service
//!
//! Owns submission, operator entry and edits, payment callbacks, and the
//! explicit status transitions. Every mutation commits atomically with its
//! audit entry; status never moves except through the transition table.

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::repositories::Repositories;
use crate::models::{
    audit_actions, AccommodationType, CreateAttendeeRequest, CreateRegistrationRequest, Event,
    EventStatus, NewAuditEntry, Registration, RegistrationSource, RegistrationStatus,
    UpdateRegistrationRequest,
};
use crate::services::notification::{templates, NotificationService};
use crate::services::pricing::PricingService;
use crate::utils::errors::{OpsError, Result};
use crate::utils::helpers::{normalize_email, normalize_phone};
use crate::utils::logging::log_registration_action;

/// Public form submission.
#[derive(Debug, Clone)]
pub struct SubmitRegistrationRequest {
    pub event_slug: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub accommodation_type: AccommodationType,
    pub dietary_restrictions: Option<String>,
    pub scholarship_code: Option<String>,
    /// Required for donation-priced events.
    pub donation_amount_cents: Option<i64>,
}

/// Operator-entered registration, optionally completed on the spot with a
/// recorded amount (cash at the door).
#[derive(Debug, Clone)]
pub struct ManualEntryRequest {
    pub event_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub accommodation_type: AccommodationType,
    pub dietary_restrictions: Option<String>,
    pub source: RegistrationSource,
    pub amount_cents: i64,
    /// Record as `complete` with the amount immediately.
    pub paid: bool,
    pub notes: Option<String>,
    pub actor: String,
}

#[derive(Clone)]
pub struct RegistrationService {
    repositories: Repositories,
    pricing: PricingService,
    notifications: NotificationService,
}

impl RegistrationService {
    pub fn new(
        repositories: Repositories,
        pricing: PricingService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            repositories,
            pricing,
            notifications,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Registration> {
        self.repositories
            .registrations
            .find_by_id(id)
            .await?
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        self.repositories.registrations.list_by_event(event_id).await
    }

    /// Find the attendee by normalized email or create them, refreshing
    /// contact details on the way.
    async fn upsert_attendee(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<Uuid> {
        let email = normalize_email(email);
        let phone = phone.and_then(normalize_phone);

        match self.repositories.attendees.find_by_email(&email).await? {
            Some(existing) => {
                let phone = phone.or(existing.phone.clone());
                let updated = self
                    .repositories
                    .attendees
                    .update_contact(existing.id, first_name, last_name, phone)
                    .await?;
                Ok(updated.id)
            }
            None => {
                let created = self
                    .repositories
                    .attendees
                    .create(CreateAttendeeRequest {
                        email,
                        first_name: first_name.to_string(),
                        last_name: last_name.to_string(),
                        phone,
                    })
                    .await?;
                Ok(created.id)
            }
        }
    }

    async fn guard_no_duplicate(&self, event_id: Uuid, attendee_id: Uuid) -> Result<()> {
        if self
            .repositories
            .registrations
            .find_active_for_attendee(event_id, attendee_id)
            .await?
            .is_some()
        {
            return Err(OpsError::DuplicateRegistration);
        }
        Ok(())
    }

    async fn guard_capacity(&self, event: &Event) -> Result<()> {
        if let Some(capacity) = event.capacity {
            let count = self
                .repositories
                .registrations
                .count_toward_capacity(event.id)
                .await?;
            if count >= capacity as i64 {
                return Err(OpsError::EventAtCapacity);
            }
        }
        Ok(())
    }

    /// Public registration submission.
    ///
    /// Guards run before pricing so a rejected submission never consumes a
    /// scholarship use. A zero resolved price completes the registration
    /// immediately with `payment_amount_cents = 0`.
    pub async fn submit(&self, request: SubmitRegistrationRequest) -> Result<Registration> {
        let event = self
            .repositories
            .events
            .find_by_slug(&request.event_slug)
            .await?
            .ok_or_else(|| OpsError::EventSlugNotFound {
                slug: request.event_slug.clone(),
            })?;
        if event.status != EventStatus::Active {
            return Err(OpsError::EventNotActive {
                slug: event.slug.clone(),
            });
        }

        let attendee_id = self
            .upsert_attendee(
                &request.email,
                &request.first_name,
                &request.last_name,
                request.phone.as_deref(),
            )
            .await?;

        self.guard_no_duplicate(event.id, attendee_id).await?;
        self.guard_capacity(&event).await?;

        let resolved = self
            .pricing
            .resolve(
                &event,
                attendee_id,
                request.scholarship_code.as_deref(),
                request.donation_amount_cents,
            )
            .await?;

        let (status, payment_amount_cents) = if resolved.amount_due_cents == 0 {
            (RegistrationStatus::Complete, Some(0))
        } else {
            (RegistrationStatus::PendingPayment, None)
        };

        let audit = NewAuditEntry::new("registration", Uuid::nil(), audit_actions::CREATE, "registration_form")
            .with_new_value(json!({
                "status": status.as_str(),
                "amount_due_cents": resolved.amount_due_cents,
                "scholarship_code": resolved.scholarship_code,
            }));

        let registration = self
            .repositories
            .registrations
            .create(
                CreateRegistrationRequest {
                    event_id: event.id,
                    attendee_id,
                    status,
                    amount_due_cents: resolved.amount_due_cents,
                    payment_amount_cents,
                    accommodation_type: request.accommodation_type,
                    dietary_restrictions: request.dietary_restrictions,
                    source: RegistrationSource::RegistrationForm,
                    notes: None,
                    member_discount_applied: resolved.member_discount_applied,
                },
                audit,
            )
            .await?;

        info!(
            registration_id = %registration.id,
            event_slug = %event.slug,
            status = %registration.status,
            amount_due_cents = registration.amount_due_cents,
            "Registration submitted"
        );

        let template = match registration.status {
            RegistrationStatus::Complete => templates::CONFIRMATION,
            _ => templates::PAYMENT_INSTRUCTIONS,
        };
        self.notifications.send_lifecycle(&registration, template).await;

        Ok(registration)
    }

    /// Operator manual or walk-in entry. Bypasses the capacity guard: the
    /// operator at the door is the override.
    pub async fn manual_entry(&self, request: ManualEntryRequest) -> Result<Registration> {
        if request.source == RegistrationSource::RegistrationForm {
            return Err(OpsError::InvalidInput(
                "manual entry source must be manual or walk_in".to_string(),
            ));
        }

        let event = self
            .repositories
            .events
            .find_by_id(request.event_id)
            .await?
            .ok_or(OpsError::EventNotFound {
                event_id: request.event_id,
            })?;

        let attendee_id = self
            .upsert_attendee(
                &request.email,
                &request.first_name,
                &request.last_name,
                request.phone.as_deref(),
            )
            .await?;
        self.guard_no_duplicate(event.id, attendee_id).await?;

        let (status, payment_amount_cents) = if request.paid || request.amount_cents == 0 {
            (RegistrationStatus::Complete, Some(request.amount_cents))
        } else {
            (RegistrationStatus::PendingPayment, None)
        };

        let audit = NewAuditEntry::new(
            "registration",
            Uuid::nil(),
            audit_actions::MANUAL_ENTRY,
            &request.actor,
        )
        .with_new_value(json!({
            "status": status.as_str(),
            "source": request.source.as_str(),
            "amount_cents": request.amount_cents,
        }));

        let registration = self
            .repositories
            .registrations
            .create(
                CreateRegistrationRequest {
                    event_id: event.id,
                    attendee_id,
                    status,
                    amount_due_cents: request.amount_cents,
                    payment_amount_cents,
                    accommodation_type: request.accommodation_type,
                    dietary_restrictions: request.dietary_restrictions,
                    source: request.source,
                    notes: request.notes,
                    member_discount_applied: false,
                },
                audit,
            )
            .await?;

        info!(
            registration_id = %registration.id,
            source = %registration.source,
            actor = %request.actor,
            "Manual registration entered"
        );
        Ok(registration)
    }

    /// Operator edit of non-status fields, audited with before/after
    /// snapshots of the fields that changed.
    pub async fn update_details(
        &self,
        id: Uuid,
        request: UpdateRegistrationRequest,
        actor: &str,
    ) -> Result<Registration> {
        let current = self.get(id).await?;

        let mut old_value = serde_json::Map::new();
        let mut new_value = serde_json::Map::new();
        if let Some(accommodation_type) = request.accommodation_type {
            old_value.insert(
                "accommodation_type".to_string(),
                json!(current.accommodation_type.as_str()),
            );
            new_value.insert(
                "accommodation_type".to_string(),
                json!(accommodation_type.as_str()),
            );
        }
        if let Some(dietary) = &request.dietary_restrictions {
            old_value.insert(
                "dietary_restrictions".to_string(),
                json!(current.dietary_restrictions),
            );
            new_value.insert("dietary_restrictions".to_string(), json!(dietary));
        }
        if let Some(notes) = &request.notes {
            old_value.insert("notes".to_string(), json!(current.notes));
            new_value.insert("notes".to_string(), json!(notes));
        }
        if let Some(flag) = request.cancellation_requested {
            old_value.insert(
                "cancellation_requested".to_string(),
                json!(current.cancellation_requested),
            );
            new_value.insert("cancellation_requested".to_string(), json!(flag));
        }

        let audit = NewAuditEntry::new("registration", id, audit_actions::UPDATE, actor)
            .with_old_value(serde_json::Value::Object(old_value))
            .with_new_value(serde_json::Value::Object(new_value));

        self.repositories
            .registrations
            .update_details(id, request, audit)
            .await
    }

    /// Flag a cancellation request on an otherwise unchanged registration.
    /// An operator resolves it later via `cancel` or by clearing the flag.
    pub async fn request_cancellation(&self, id: Uuid, actor: &str) -> Result<Registration> {
        let current = self.get(id).await?;
        if current.status.is_terminal() {
            return Err(OpsError::InvalidTransition {
                from: current.status.to_string(),
                to: RegistrationStatus::Cancelled.to_string(),
            });
        }

        let audit = NewAuditEntry::new(
            "registration",
            id,
            audit_actions::CANCELLATION_REQUESTED,
            actor,
        )
        .with_old_value(json!({ "cancellation_requested": current.cancellation_requested }))
        .with_new_value(json!({ "cancellation_requested": true }));

        self.repositories
            .registrations
            .update_details(
                id,
                UpdateRegistrationRequest {
                    cancellation_requested: Some(true),
                    ..Default::default()
                },
                audit,
            )
            .await
    }

    /// Explicit operator transition helper: validates against the
    /// transition table, then compare-and-sets on the observed status.
    async fn transition(
        &self,
        id: Uuid,
        target: RegistrationStatus,
        payment_amount_cents: Option<i64>,
        actor: &str,
    ) -> Result<Registration> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(target) {
            return Err(OpsError::InvalidTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            });
        }

        let audit = NewAuditEntry::status_change(id, actor, current.status, target);
        let registration = self
            .repositories
            .registrations
            .transition_status(id, current.status, target, payment_amount_cents, audit)
            .await?;
        log_registration_action(id, audit_actions::UPDATE_STATUS, actor);
        Ok(registration)
    }

    /// Operator cancellation, from `pending_payment` or `complete`.
    pub async fn cancel(&self, id: Uuid, actor: &str) -> Result<Registration> {
        self.transition(id, RegistrationStatus::Cancelled, None, actor)
            .await
    }

    /// Refund of a completed registration, tied to an external refund
    /// confirmation. `payment_amount_cents` is kept for the record.
    pub async fn refund(&self, id: Uuid, actor: &str) -> Result<Registration> {
        self.transition(id, RegistrationStatus::Refunded, None, actor)
            .await
    }

    /// Payment-provider confirmation callback.
    ///
    /// A replay for an already-complete registration with a matching amount
    /// is a no-op; a divergent amount is surfaced as `AmountMismatch` for
    /// manual review, never silently overwritten.
    pub async fn on_payment_confirmed(&self, id: Uuid, amount_cents: i64) -> Result<Registration> {
        let current = self.get(id).await?;

        match current.status {
            RegistrationStatus::Complete => {
                if current.payment_amount_cents == Some(amount_cents) {
                    info!(registration_id = %id, "Duplicate payment confirmation ignored");
                    Ok(current)
                } else {
                    Err(OpsError::AmountMismatch {
                        received_cents: amount_cents,
                        recorded_cents: current.payment_amount_cents.unwrap_or(0),
                    })
                }
            }
            RegistrationStatus::PendingPayment => {
                if amount_cents < current.amount_due_cents {
                    return Err(OpsError::AmountMismatch {
                        received_cents: amount_cents,
                        recorded_cents: current.amount_due_cents,
                    });
                }

                let audit = NewAuditEntry::status_change(
                    id,
                    "payment_provider",
                    RegistrationStatus::PendingPayment,
                    RegistrationStatus::Complete,
                );
                let registration = self
                    .repositories
                    .registrations
                    .transition_status(
                        id,
                        RegistrationStatus::PendingPayment,
                        RegistrationStatus::Complete,
                        Some(amount_cents),
                        audit,
                    )
                    .await?;

                info!(registration_id = %id, amount_cents, "Payment confirmed");
                self.notifications
                    .send_lifecycle(&registration, templates::CONFIRMATION)
                    .await;
                Ok(registration)
            }
            other => Err(OpsError::InvalidTransition {
                from: other.to_string(),
                to: RegistrationStatus::Complete.to_string(),
            }),
        }
    }

    /// Payment-provider failure callback. The registration stays
    /// `pending_payment` (the attendee may retry until expiry); the failure
    /// is audited for the record.
    pub async fn on_payment_failed(&self, id: Uuid) -> Result<()> {
        let current = self.get(id).await?;
        if current.status != RegistrationStatus::PendingPayment {
            warn!(
                registration_id = %id,
                status = %current.status,
                "Payment failure for a registration no longer pending"
            );
        }

        self.repositories
            .audit
            .append(
                NewAuditEntry::new(
                    "registration",
                    id,
                    audit_actions::PAYMENT_FAILED,
                    "payment_provider",
                )
                .with_new_value(json!({ "status": current.status.as_str() })),
            )
            .await?;
        Ok(())
    }
}
