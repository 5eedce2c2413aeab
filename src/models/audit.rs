//! Audit log model
//!
//! Every mutation made by the state machine, check-in ledger, or operator
//! edits appends exactly one immutable entry, committed atomically with the
//! mutation it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub mod actions {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const UPDATE_STATUS: &str = "update_status";
    pub const MANUAL_ENTRY: &str = "manual_entry";
    pub const CHECK_IN: &str = "check_in";
    pub const UNDO_CHECK_IN: &str = "undo_check_in";
    pub const CANCELLATION_REQUESTED: &str = "cancellation_requested";
    pub const PAYMENT_FAILED: &str = "payment_failed";
    pub const SCHOLARSHIP_CREATED: &str = "scholarship_created";
    pub const SCHOLARSHIP_DEACTIVATED: &str = "scholarship_deactivated";
    pub const MEMBERSHIP_CREATED: &str = "membership_created";
    pub const MEMBERSHIP_DEACTIVATED: &str = "membership_deactivated";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub actor: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub actor: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(entity_type: &str, entity_id: Uuid, action: &str, actor: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id,
            action: action.to_string(),
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
        }
    }

    /// Entry for a registration status change, capturing before/after
    /// status snapshots.
    pub fn status_change(
        registration_id: Uuid,
        actor: &str,
        from: crate::models::RegistrationStatus,
        to: crate::models::RegistrationStatus,
    ) -> Self {
        Self::new("registration", registration_id, actions::UPDATE_STATUS, actor)
            .with_old_value(serde_json::json!({ "status": from.as_str() }))
            .with_new_value(serde_json::json!({ "status": to.as_str() }))
    }

    pub fn with_old_value(mut self, value: serde_json::Value) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn with_new_value(mut self, value: serde_json::Value) -> Self {
        self.new_value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrationStatus;

    #[test]
    fn test_status_change_snapshots() {
        let id = Uuid::new_v4();
        let entry = NewAuditEntry::status_change(
            id,
            "sweep",
            RegistrationStatus::PendingPayment,
            RegistrationStatus::Expired,
        );
        assert_eq!(entry.action, actions::UPDATE_STATUS);
        assert_eq!(
            entry.old_value,
            Some(serde_json::json!({ "status": "pending_payment" }))
        );
        assert_eq!(
            entry.new_value,
            Some(serde_json::json!({ "status": "expired" }))
        );
    }
}
