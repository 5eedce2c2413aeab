//! Registration CSV export

use csv::Writer;
use uuid::Uuid;

use crate::database::repositories::Repositories;
use crate::utils::errors::{OpsError, Result};

#[derive(Clone)]
pub struct ExportService {
    repositories: Repositories,
}

impl ExportService {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// One row per registration, in registration order. `amount_cents` is
    /// the recorded payment when one exists, blank otherwise.
    pub async fn export_event_csv(&self, event_id: Uuid) -> Result<String> {
        self.repositories
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(OpsError::EventNotFound { event_id })?;

        let registrations = self
            .repositories
            .registrations
            .list_by_event(event_id)
            .await?;

        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "name",
            "email",
            "phone",
            "status",
            "amount_cents",
            "accommodation",
            "dietary",
            "source",
            "created_at",
        ])?;

        for registration in registrations {
            let attendee = self
                .repositories
                .attendees
                .find_by_id(registration.attendee_id)
                .await?
                .ok_or(OpsError::AttendeeNotFound {
                    attendee_id: registration.attendee_id,
                })?;

            let amount = registration
                .payment_amount_cents
                .map(|cents| cents.to_string())
                .unwrap_or_default();

            writer.write_record([
                attendee.full_name().as_str(),
                attendee.email.as_str(),
                attendee.phone.as_deref().unwrap_or(""),
                registration.status.as_str(),
                amount.as_str(),
                registration.accommodation_type.as_str(),
                registration.dietary_restrictions.as_deref().unwrap_or(""),
                registration.source.as_str(),
                registration.created_at.to_rfc3339().as_str(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| OpsError::Io(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| OpsError::InvalidInput(format!("CSV output was not UTF-8: {e}")))
    }
}
