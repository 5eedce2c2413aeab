//! Membership model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A standing flat discount held by an attendee, applied across events.
///
/// At most one membership per attendee is active at a time; creating a new
/// one deactivates prior actives in the same unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub attendee_id: Uuid,
    pub discount_value_cents: i64,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMembershipRequest {
    pub attendee_id: Uuid,
    pub discount_value_cents: i64,
}
