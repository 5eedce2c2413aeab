//! Postgres registration repository
//!
//! Status only ever changes through `transition_status`, a compare-and-set
//! on the expected source status. Two operations racing for the same
//! registration cannot both win: the conditional UPDATE matches zero rows
//! for the loser and no mutation or audit entry is committed for it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::{audit, RegistrationRepository};
use crate::models::{
    CreateRegistrationRequest, NewAuditEntry, Registration, RegistrationStatus,
    UpdateRegistrationRequest,
};
use crate::utils::errors::{OpsError, Result};

const COLUMNS: &str = "id, event_id, attendee_id, status, amount_due_cents, \
    payment_amount_cents, accommodation_type, dietary_restrictions, source, notes, \
    cancellation_requested, member_discount_applied, reminder_sent_at, checked_in_at, \
    checked_in_by, created_at, updated_at";

#[derive(Clone)]
pub struct PgRegistrationRepository {
    pool: DatabasePool,
}

impl PgRegistrationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Map a zero-row conditional update to the precise rejection: the
    /// registration either does not exist or sits in a status the guard
    /// does not accept.
    async fn rejection_for(&self, id: Uuid, target: RegistrationStatus) -> OpsError {
        match self.fetch_by_id(id).await {
            Ok(Some(current)) => OpsError::InvalidTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            },
            Ok(None) => OpsError::RegistrationNotFound {
                registration_id: id,
            },
            Err(err) => err,
        }
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    async fn create(
        &self,
        request: CreateRegistrationRequest,
        audit_entry: NewAuditEntry,
    ) -> Result<Registration> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            INSERT INTO registrations (id, event_id, attendee_id, status, amount_due_cents,
                payment_amount_cents, accommodation_type, dietary_restrictions, source, notes,
                cancellation_requested, member_discount_applied, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, $11, $12, $13)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.event_id)
        .bind(request.attendee_id)
        .bind(request.status)
        .bind(request.amount_due_cents)
        .bind(request.payment_amount_cents)
        .bind(request.accommodation_type)
        .bind(request.dietary_restrictions)
        .bind(request.source)
        .bind(request.notes)
        .bind(request.member_discount_applied)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // The caller cannot know the id before the insert.
        let mut audit_entry = audit_entry;
        audit_entry.entity_id = registration.id;
        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(registration)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>> {
        self.fetch_by_id(id).await
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY created_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    async fn list_by_event_and_statuses(
        &self,
        event_id: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<Registration>> {
        let status_names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let registrations = sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {COLUMNS} FROM registrations
            WHERE event_id = $1 AND status = ANY($2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(event_id)
        .bind(status_names)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    async fn list_by_status(&self, status: RegistrationStatus) -> Result<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {COLUMNS} FROM registrations WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    async fn find_active_for_attendee(
        &self,
        event_id: Uuid,
        attendee_id: Uuid,
    ) -> Result<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {COLUMNS} FROM registrations
            WHERE event_id = $1 AND attendee_id = $2
              AND status IN ('pending_payment', 'complete')
            LIMIT 1
            "#
        ))
        .bind(event_id)
        .bind(attendee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    async fn count_toward_capacity(&self, event_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM registrations
            WHERE event_id = $1 AND status IN ('pending_payment', 'complete')
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        target: RegistrationStatus,
        payment_amount_cents: Option<i64>,
        audit_entry: NewAuditEntry,
    ) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET status = $3,
                payment_amount_cents = COALESCE($4, payment_amount_cents),
                updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(target)
        .bind(payment_amount_cents)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(registration) => {
                audit::insert_entry(&mut tx, &audit_entry).await?;
                tx.commit().await?;
                Ok(registration)
            }
            None => {
                tx.rollback().await?;
                Err(self.rejection_for(id, target).await)
            }
        }
    }

    async fn update_details(
        &self,
        id: Uuid,
        request: UpdateRegistrationRequest,
        audit_entry: NewAuditEntry,
    ) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OpsError::RegistrationNotFound {
            registration_id: id,
        })?;

        let accommodation_type = request
            .accommodation_type
            .unwrap_or(current.accommodation_type);
        let dietary_restrictions = request
            .dietary_restrictions
            .unwrap_or(current.dietary_restrictions);
        let notes = request.notes.unwrap_or(current.notes);
        let cancellation_requested = request
            .cancellation_requested
            .unwrap_or(current.cancellation_requested);

        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET accommodation_type = $2,
                dietary_restrictions = $3,
                notes = $4,
                cancellation_requested = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(accommodation_type)
        .bind(dietary_restrictions)
        .bind(notes)
        .bind(cancellation_requested)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(registration)
    }

    async fn set_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        operator: &str,
        audit_entry: NewAuditEntry,
    ) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET checked_in_at = $2, checked_in_by = $3, updated_at = $4
            WHERE id = $1 AND status = 'complete'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .bind(operator)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(registration) => {
                audit::insert_entry(&mut tx, &audit_entry).await?;
                tx.commit().await?;
                Ok(registration)
            }
            None => {
                tx.rollback().await?;
                match self.fetch_by_id(id).await? {
                    Some(_) => Err(OpsError::NotEligible {
                        registration_id: id,
                    }),
                    None => Err(OpsError::RegistrationNotFound {
                        registration_id: id,
                    }),
                }
            }
        }
    }

    async fn clear_check_in(&self, id: Uuid, audit_entry: NewAuditEntry) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET checked_in_at = NULL, checked_in_by = NULL, updated_at = $2
            WHERE id = $1 AND checked_in_at IS NOT NULL
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(registration) => {
                audit::insert_entry(&mut tx, &audit_entry).await?;
                tx.commit().await?;
                Ok(registration)
            }
            None => {
                tx.rollback().await?;
                match self.fetch_by_id(id).await? {
                    Some(_) => Err(OpsError::NotCheckedIn {
                        registration_id: id,
                    }),
                    None => Err(OpsError::RegistrationNotFound {
                        registration_id: id,
                    }),
                }
            }
        }
    }

    async fn claim_reminder(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET reminder_sent_at = $2, updated_at = $2
            WHERE id = $1 AND reminder_sent_at IS NULL AND status = 'pending_payment'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
