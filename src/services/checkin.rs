//! Check-in ledger
//!
//! Records and reverses physical check-in against completed registrations.
//! Two operators tapping the same attendee simultaneously is an expected
//! race, not an error: both calls succeed and the timestamp is last-write-
//! wins.

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::database::repositories::Repositories;
use crate::models::{audit_actions, Attendee, NewAuditEntry, Registration, RegistrationStatus};
use crate::utils::errors::{OpsError, Result};

/// One roster line: a completed registration with its attendee.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub registration: Registration,
    pub attendee: Attendee,
}

#[derive(Clone)]
pub struct CheckInService {
    repositories: Repositories,
}

impl CheckInService {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Mark a completed registration as present. Idempotent: re-checking an
    /// already checked-in registration succeeds and refreshes the stamp.
    pub async fn check_in(&self, id: Uuid, operator: &str) -> Result<Registration> {
        let at = Utc::now();
        let audit = NewAuditEntry::new("registration", id, audit_actions::CHECK_IN, operator)
            .with_new_value(json!({ "checked_in_at": at, "checked_in_by": operator }));

        let registration = self
            .repositories
            .registrations
            .set_check_in(id, at, operator, audit)
            .await?;

        info!(registration_id = %id, operator, "Checked in");
        Ok(registration)
    }

    /// Reverse a check-in, clearing both fields.
    pub async fn undo_check_in(&self, id: Uuid, operator: &str) -> Result<Registration> {
        let current = self
            .repositories
            .registrations
            .find_by_id(id)
            .await?
            .ok_or(OpsError::RegistrationNotFound {
                registration_id: id,
            })?;

        let audit = NewAuditEntry::new("registration", id, audit_actions::UNDO_CHECK_IN, operator)
            .with_old_value(json!({
                "checked_in_at": current.checked_in_at,
                "checked_in_by": current.checked_in_by,
            }));

        let registration = self
            .repositories
            .registrations
            .clear_check_in(id, audit)
            .await?;

        info!(registration_id = %id, operator, "Check-in reversed");
        Ok(registration)
    }

    /// Door roster: completed registrations with attendee contact details,
    /// in registration order.
    pub async fn roster(&self, event_id: Uuid) -> Result<Vec<RosterEntry>> {
        let registrations = self
            .repositories
            .registrations
            .list_by_event_and_statuses(event_id, &[RegistrationStatus::Complete])
            .await?;

        let mut roster = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let attendee = self
                .repositories
                .attendees
                .find_by_id(registration.attendee_id)
                .await?
                .ok_or(OpsError::AttendeeNotFound {
                    attendee_id: registration.attendee_id,
                })?;
            roster.push(RosterEntry {
                registration,
                attendee,
            });
        }
        Ok(roster)
    }
}
