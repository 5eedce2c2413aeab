//! Postgres scholarship link repository
//!
//! Redemption is a single conditional UPDATE so concurrent submissions can
//! never push `uses` past `max_uses`.

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::{audit, ScholarshipRepository};
use crate::models::{CreateScholarshipLinkRequest, NewAuditEntry, ScholarshipLink};
use crate::utils::errors::{OpsError, Result};
use crate::utils::helpers::generate_scholarship_code;

const COLUMNS: &str = "id, event_id, code, override_price_cents, max_uses, uses, active, created_at";

#[derive(Clone)]
pub struct PgScholarshipRepository {
    pool: DatabasePool,
}

impl PgScholarshipRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScholarshipRepository for PgScholarshipRepository {
    async fn create(
        &self,
        request: CreateScholarshipLinkRequest,
        audit_entry: NewAuditEntry,
    ) -> Result<ScholarshipLink> {
        let code = request.code.unwrap_or_else(generate_scholarship_code);
        let mut tx = self.pool.begin().await?;

        let link = sqlx::query_as::<_, ScholarshipLink>(&format!(
            r#"
            INSERT INTO scholarship_links (id, event_id, code, override_price_cents, max_uses, uses, active, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, true, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.event_id)
        .bind(code)
        .bind(request.override_price_cents)
        .bind(request.max_uses)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let mut audit_entry = audit_entry;
        audit_entry.entity_id = link.id;
        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ScholarshipLink>> {
        let link = sqlx::query_as::<_, ScholarshipLink>(&format!(
            "SELECT {COLUMNS} FROM scholarship_links WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<ScholarshipLink>> {
        let links = sqlx::query_as::<_, ScholarshipLink>(&format!(
            "SELECT {COLUMNS} FROM scholarship_links WHERE event_id = $1 ORDER BY created_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    async fn redeem(&self, code: &str) -> Result<ScholarshipLink> {
        let redeemed = sqlx::query_as::<_, ScholarshipLink>(&format!(
            r#"
            UPDATE scholarship_links
            SET uses = uses + 1
            WHERE code = $1 AND active = true AND uses < max_uses
            RETURNING {COLUMNS}
            "#
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match redeemed {
            Some(link) => Ok(link),
            None => match self.find_by_code(code).await? {
                Some(_) => Err(OpsError::ScholarshipExhausted {
                    code: code.to_string(),
                }),
                None => Err(OpsError::ScholarshipInvalid {
                    code: code.to_string(),
                }),
            },
        }
    }

    async fn deactivate(&self, id: Uuid, audit_entry: NewAuditEntry) -> Result<ScholarshipLink> {
        let mut tx = self.pool.begin().await?;

        let link = sqlx::query_as::<_, ScholarshipLink>(&format!(
            r#"
            UPDATE scholarship_links SET active = false
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| OpsError::InvalidInput(format!("scholarship link not found: {id}")))?;

        audit::insert_entry(&mut tx, &audit_entry).await?;
        tx.commit().await?;

        Ok(link)
    }
}
