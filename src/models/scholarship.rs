//! Scholarship link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A discount code scoped to one event with a bounded number of
/// redemptions.
///
/// `uses` never exceeds `max_uses`: redemption is an atomic
/// increment-if-under-limit, so an exhausted code becomes inert rather than
/// over-redeemed. Codes are retired by explicit deactivation only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScholarshipLink {
    pub id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub override_price_cents: i64,
    pub max_uses: i32,
    pub uses: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ScholarshipLink {
    pub fn has_remaining_uses(&self) -> bool {
        self.active && self.uses < self.max_uses
    }
}

#[derive(Debug, Clone)]
pub struct CreateScholarshipLinkRequest {
    /// Generated when not supplied.
    pub code: Option<String>,
    pub event_id: Uuid,
    pub override_price_cents: i64,
    pub max_uses: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(uses: i32, max_uses: i32, active: bool) -> ScholarshipLink {
        ScholarshipLink {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "SCH-ABCD1234".to_string(),
            override_price_cents: 1000,
            max_uses,
            uses,
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_remaining_uses() {
        assert!(link(0, 2, true).has_remaining_uses());
        assert!(link(1, 2, true).has_remaining_uses());
        assert!(!link(2, 2, true).has_remaining_uses());
        assert!(!link(0, 2, false).has_remaining_uses());
    }
}
