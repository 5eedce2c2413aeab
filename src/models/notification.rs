//! Notification batch and send-log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Channel requested for a bulk send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationChannel {
    Sms,
    Email,
    Both,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Sms => "sms",
            NotificationChannel::Email => "email",
            NotificationChannel::Both => "both",
        }
    }

    pub fn includes_sms(&self) -> bool {
        matches!(self, NotificationChannel::Sms | NotificationChannel::Both)
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, NotificationChannel::Email | NotificationChannel::Both)
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single transport send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
}

/// Deduplication record for one bulk-send request, keyed by the
/// caller-supplied idempotency key. Valid for a bounded window; beyond it
/// the same key is treated as new.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationBatch {
    pub idempotency_key: String,
    pub event_id: Uuid,
    pub channel: NotificationChannel,
    pub status: BatchStatus,
    pub sent_count: i32,
    pub failed_count: i32,
    pub started_at: DateTime<Utc>,
}

/// Outcome of a bulk dispatch, as returned to the caller. Individual
/// recipient failures are tallied here, never raised as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub sent_count: i32,
    pub failed_count: i32,
    /// True when this request was answered from the dedup record of an
    /// earlier call with the same idempotency key.
    pub deduplicated: bool,
}

/// Per-recipient record of an attempted send.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationLogEntry {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub channel: NotificationChannel,
    pub template_key: String,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotificationLogEntry {
    pub registration_id: Uuid,
    pub channel: NotificationChannel,
    pub template_key: String,
    pub status: DeliveryStatus,
}
