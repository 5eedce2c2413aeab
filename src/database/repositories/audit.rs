//! Postgres audit log repository
//!
//! The audit log is append-only. Repositories that mutate audited entities
//! call `insert_entry` on their own open transaction so the entry commits
//! with the mutation it describes.

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::AuditLogRepository;
use crate::models::{AuditLogEntry, NewAuditEntry};
use crate::utils::errors::Result;

const COLUMNS: &str =
    "id, entity_type, entity_id, action, actor, old_value, new_value, timestamp";

/// Insert one audit entry on the given connection. Used standalone through
/// the pool and from other repositories inside their transactions.
pub(crate) async fn insert_entry(
    conn: &mut sqlx::PgConnection,
    entry: &NewAuditEntry,
) -> Result<AuditLogEntry> {
    let inserted = sqlx::query_as::<_, AuditLogEntry>(&format!(
        r#"
        INSERT INTO audit_log (id, entity_type, entity_id, action, actor, old_value, new_value, timestamp)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.action)
    .bind(&entry.actor)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(inserted)
}

#[derive(Clone)]
pub struct PgAuditLogRepository {
    pool: DatabasePool,
}

impl PgAuditLogRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, &entry).await
    }

    async fn list_for_entity(&self, entity_id: Uuid, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(&format!(
            r#"
            SELECT {COLUMNS} FROM audit_log
            WHERE entity_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#
        ))
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(&format!(
            r#"
            SELECT {COLUMNS} FROM audit_log
            ORDER BY timestamp DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
