//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Default minimum donation when an event does not configure one.
pub const DEFAULT_MIN_DONATION_CENTS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PricingModel {
    Fixed,
    Donation,
    Free,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Fixed => "fixed",
            PricingModel::Donation => "donation",
            PricingModel::Free => "free",
        }
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Active => "active",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticketed or donation-based retreat event.
///
/// Events are never hard-deleted; `Cancelled` is the soft-delete status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub pricing_model: PricingModel,
    pub fixed_price_cents: Option<i64>,
    pub min_donation_cents: Option<i64>,
    pub capacity: Option<i32>,
    pub reminder_delay_minutes: i64,
    pub auto_expire_hours: i64,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Minimum accepted donation, applying the default when unset.
    pub fn effective_min_donation_cents(&self) -> i64 {
        self.min_donation_cents.unwrap_or(DEFAULT_MIN_DONATION_CENTS)
    }
}

#[derive(Debug, Clone)]
pub struct CreateEventRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub pricing_model: PricingModel,
    pub fixed_price_cents: Option<i64>,
    pub min_donation_cents: Option<i64>,
    pub capacity: Option<i32>,
    pub reminder_delay_minutes: i64,
    pub auto_expire_hours: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub event_date: Option<DateTime<Utc>>,
    pub fixed_price_cents: Option<Option<i64>>,
    pub min_donation_cents: Option<Option<i64>>,
    pub capacity: Option<Option<i32>>,
    pub reminder_delay_minutes: Option<i64>,
    pub auto_expire_hours: Option<i64>,
    pub status: Option<EventStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_donation_default() {
        let event = Event {
            id: Uuid::new_v4(),
            name: "Forest Retreat".to_string(),
            slug: "forest-retreat".to_string(),
            description: None,
            event_date: Utc::now(),
            pricing_model: PricingModel::Donation,
            fixed_price_cents: None,
            min_donation_cents: None,
            capacity: None,
            reminder_delay_minutes: 60,
            auto_expire_hours: 24,
            status: EventStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(event.effective_min_donation_cents(), DEFAULT_MIN_DONATION_CENTS);

        let event = Event {
            min_donation_cents: Some(500),
            ..event
        };
        assert_eq!(event.effective_min_donation_cents(), 500);
    }
}
