//! Postgres notification batch and send-log repository
//!
//! Batch claims are first-writer-wins on the idempotency key: an
//! `INSERT .. ON CONFLICT DO NOTHING` either owns the key or reads back the
//! record of the caller that did. Keys older than the dedup window are
//! dropped before the claim, so a stale key never suppresses a new send.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::{BatchBegin, NotificationRepository};
use crate::models::{
    BatchStatus, NewNotificationLogEntry, NotificationBatch, NotificationChannel,
    NotificationLogEntry,
};
use crate::utils::errors::{OpsError, Result};

const BATCH_COLUMNS: &str =
    "idempotency_key, event_id, channel, status, sent_count, failed_count, started_at";

const LOG_COLUMNS: &str = "id, registration_id, channel, template_key, status, sent_at";

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: DatabasePool,
}

impl PgNotificationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn try_begin_batch(
        &self,
        key: &str,
        event_id: Uuid,
        channel: NotificationChannel,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<BatchBegin> {
        let cutoff = now - window;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notification_batches WHERE idempotency_key = $1 AND started_at < $2")
            .bind(key)
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO notification_batches (idempotency_key, event_id, channel, status, sent_count, failed_count, started_at)
            VALUES ($1, $2, $3, $4, 0, 0, $5)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(event_id)
        .bind(channel)
        .bind(BatchStatus::InProgress)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(BatchBegin::Started);
        }

        let existing = sqlx::query_as::<_, NotificationBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM notification_batches WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BatchBegin::Duplicate(existing))
    }

    async fn complete_batch(&self, key: &str, sent_count: i32, failed_count: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_batches
            SET status = $2, sent_count = $3, failed_count = $4
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .bind(BatchStatus::Completed)
        .bind(sent_count)
        .bind(failed_count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OpsError::InvalidInput(format!(
                "notification batch not found: {key}"
            )));
        }

        Ok(())
    }

    async fn append_log(&self, entry: NewNotificationLogEntry) -> Result<NotificationLogEntry> {
        let logged = sqlx::query_as::<_, NotificationLogEntry>(&format!(
            r#"
            INSERT INTO notification_log (id, registration_id, channel, template_key, status, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(entry.registration_id)
        .bind(entry.channel)
        .bind(entry.template_key)
        .bind(entry.status)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(logged)
    }

    async fn list_log_for_event(
        &self,
        event_id: Uuid,
        limit: i64,
    ) -> Result<Vec<NotificationLogEntry>> {
        let entries = sqlx::query_as::<_, NotificationLogEntry>(
            r#"
            SELECT nl.id, nl.registration_id, nl.channel, nl.template_key, nl.status, nl.sent_at
            FROM notification_log nl
            JOIN registrations r ON r.id = nl.registration_id
            WHERE r.event_id = $1
            ORDER BY nl.sent_at DESC
            LIMIT $2
            "#,
        )
        .bind(event_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn purge_batches_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notification_batches WHERE started_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
