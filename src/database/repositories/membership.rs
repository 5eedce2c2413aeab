//! Postgres membership repository

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::{audit, MembershipRepository};
use crate::models::{CreateMembershipRequest, Membership, NewAuditEntry};
use crate::utils::errors::{OpsError, Result};

const COLUMNS: &str = "id, attendee_id, discount_value_cents, is_active, started_at, created_at";

#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: DatabasePool,
}

impl PgMembershipRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn create(
        &self,
        request: CreateMembershipRequest,
        audit_entry: NewAuditEntry,
    ) -> Result<Membership> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // One active membership per attendee: replacing supersedes.
        sqlx::query(
            "UPDATE memberships SET is_active = false WHERE attendee_id = $1 AND is_active = true",
        )
        .bind(request.attendee_id)
        .execute(&mut *tx)
        .await?;

        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO memberships (id, attendee_id, discount_value_cents, is_active, started_at, created_at)
            VALUES ($1, $2, $3, true, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.attendee_id)
        .bind(request.discount_value_cents)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut audit_entry = audit_entry;
        audit_entry.entity_id = membership.id;
        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(membership)
    }

    async fn find_active_for_attendee(&self, attendee_id: Uuid) -> Result<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {COLUMNS} FROM memberships
            WHERE attendee_id = $1 AND is_active = true
            ORDER BY started_at DESC
            LIMIT 1
            "#
        ))
        .bind(attendee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn list_for_attendee(&self, attendee_id: Uuid) -> Result<Vec<Membership>> {
        let memberships = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {COLUMNS} FROM memberships WHERE attendee_id = $1 ORDER BY started_at DESC"
        ))
        .bind(attendee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn deactivate(&self, id: Uuid, audit_entry: NewAuditEntry) -> Result<Membership> {
        let mut tx = self.pool.begin().await?;

        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships SET is_active = false
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| OpsError::InvalidInput(format!("membership not found: {id}")))?;

        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(membership)
    }
}
