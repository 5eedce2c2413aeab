//! Registration model and status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authoritative status of a registration.
///
/// `Expired`, `Cancelled` and `Refunded` are terminal: no transition leaves
/// them. Status is only ever changed through a compare-and-set on the
/// expected source status, so concurrent transitions race safely and the
/// loser is rejected with `InvalidTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RegistrationStatus {
    PendingPayment,
    Complete,
    Expired,
    Cancelled,
    Refunded,
}

impl RegistrationStatus {
    /// All statuses, in dashboard display order.
    pub const ALL: [RegistrationStatus; 5] = [
        RegistrationStatus::PendingPayment,
        RegistrationStatus::Complete,
        RegistrationStatus::Expired,
        RegistrationStatus::Cancelled,
        RegistrationStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingPayment => "pending_payment",
            RegistrationStatus::Complete => "complete",
            RegistrationStatus::Expired => "expired",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Refunded => "refunded",
        }
    }

    /// Whether this status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Expired
                | RegistrationStatus::Cancelled
                | RegistrationStatus::Refunded
        )
    }

    /// The transition table. Creation into `PendingPayment` or `Complete`
    /// is handled at submission and is not part of this table.
    pub fn can_transition_to(&self, target: RegistrationStatus) -> bool {
        match (self, target) {
            (RegistrationStatus::PendingPayment, RegistrationStatus::Complete) => true,
            (RegistrationStatus::PendingPayment, RegistrationStatus::Expired) => true,
            (RegistrationStatus::PendingPayment, RegistrationStatus::Cancelled) => true,
            (RegistrationStatus::Complete, RegistrationStatus::Cancelled) => true,
            (RegistrationStatus::Complete, RegistrationStatus::Refunded) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accommodation options offered at the retreat site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AccommodationType {
    BellTent,
    TipiTwin,
    SelfCamping,
    DayOnly,
    None,
}

impl AccommodationType {
    pub const ALL: [AccommodationType; 5] = [
        AccommodationType::BellTent,
        AccommodationType::TipiTwin,
        AccommodationType::SelfCamping,
        AccommodationType::DayOnly,
        AccommodationType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccommodationType::BellTent => "bell_tent",
            AccommodationType::TipiTwin => "tipi_twin",
            AccommodationType::SelfCamping => "self_camping",
            AccommodationType::DayOnly => "day_only",
            AccommodationType::None => "none",
        }
    }
}

impl std::fmt::Display for AccommodationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the registration entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RegistrationSource {
    RegistrationForm,
    Manual,
    WalkIn,
}

impl RegistrationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationSource::RegistrationForm => "registration_form",
            RegistrationSource::Manual => "manual",
            RegistrationSource::WalkIn => "walk_in",
        }
    }
}

impl std::fmt::Display for RegistrationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attendee's enrollment record for one event.
///
/// `amount_due_cents` is the price resolved at submission time and backs the
/// payment-confirmation amount guard. `payment_amount_cents` is non-null
/// only once the registration is `Complete` (and survives into `Refunded`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub status: RegistrationStatus,
    pub amount_due_cents: i64,
    pub payment_amount_cents: Option<i64>,
    pub accommodation_type: AccommodationType,
    pub dietary_restrictions: Option<String>,
    pub source: RegistrationSource,
    pub notes: Option<String>,
    pub cancellation_requested: bool,
    pub member_discount_applied: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CreateRegistrationRequest {
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub status: RegistrationStatus,
    pub amount_due_cents: i64,
    pub payment_amount_cents: Option<i64>,
    pub accommodation_type: AccommodationType,
    pub dietary_restrictions: Option<String>,
    pub source: RegistrationSource,
    pub notes: Option<String>,
    pub member_discount_applied: bool,
}

/// Operator edit of non-status fields. Status moves only through the
/// explicit transition operations.
#[derive(Debug, Clone, Default)]
pub struct UpdateRegistrationRequest {
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub cancellation_requested: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_allow_no_transitions() {
        for terminal in [
            RegistrationStatus::Expired,
            RegistrationStatus::Cancelled,
            RegistrationStatus::Refunded,
        ] {
            assert!(terminal.is_terminal());
            for target in RegistrationStatus::ALL {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} must not transition to {target}"
                );
            }
        }
    }

    #[test]
    fn test_pending_payment_transitions() {
        let pending = RegistrationStatus::PendingPayment;
        assert!(pending.can_transition_to(RegistrationStatus::Complete));
        assert!(pending.can_transition_to(RegistrationStatus::Expired));
        assert!(pending.can_transition_to(RegistrationStatus::Cancelled));
        assert!(!pending.can_transition_to(RegistrationStatus::Refunded));
        assert!(!pending.can_transition_to(RegistrationStatus::PendingPayment));
    }

    #[test]
    fn test_complete_transitions() {
        let complete = RegistrationStatus::Complete;
        assert!(complete.can_transition_to(RegistrationStatus::Cancelled));
        assert!(complete.can_transition_to(RegistrationStatus::Refunded));
        assert!(!complete.can_transition_to(RegistrationStatus::Expired));
        assert!(!complete.can_transition_to(RegistrationStatus::PendingPayment));
        assert!(!complete.can_transition_to(RegistrationStatus::Complete));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in RegistrationStatus::ALL {
            let serialized = serde_json::to_string(&status).unwrap();
            assert_eq!(serialized, format!("\"{}\"", status.as_str()));
        }
    }
}
