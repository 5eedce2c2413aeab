//! Dashboard aggregation
//!
//! Pure, read-only summaries over the current registration set of an event.
//! Logistics breakdowns (accommodation, dietary) count completed
//! registrations only: pending, expired and cancelled rows must not inflate
//! catering or tent counts. Recomputed on every call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repositories::Repositories;
use crate::models::{
    AccommodationType, Event, EventStatus, Registration, RegistrationStatus,
};
use crate::utils::errors::{OpsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: RegistrationStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationCount {
    pub accommodation_type: AccommodationType,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietaryCount {
    pub dietary: String,
    pub count: i64,
}

/// Operational summary for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDashboard {
    pub event_id: Uuid,
    pub total_registrations: i64,
    /// One entry per status, zero counts included.
    pub status_breakdown: Vec<StatusCount>,
    /// Completed registrations only.
    pub accommodation_breakdown: Vec<AccommodationCount>,
    /// Completed registrations only; empty dietary text is skipped.
    pub dietary_summary: Vec<DietaryCount>,
    pub total_revenue_cents: i64,
    /// Revenue over completed registrations with a nonzero payment;
    /// 0 when there are none.
    pub average_payment_cents: i64,
    pub checked_in_count: i64,
}

/// Per-event line in the cross-event overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub name: String,
    pub slug: String,
    pub complete_count: i64,
    pub pending_count: i64,
    pub revenue_cents: i64,
    pub capacity: Option<i32>,
}

/// Organization-wide overview across active events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationOverview {
    pub active_events: i64,
    pub total_registrations: i64,
    pub total_complete: i64,
    pub total_revenue_cents: i64,
    pub events: Vec<EventSummary>,
}

/// Aggregate one event's registrations. Pure; no repository access.
pub fn aggregate_event(event_id: Uuid, registrations: &[Registration]) -> EventDashboard {
    let mut status_counts: HashMap<RegistrationStatus, i64> = HashMap::new();
    let mut accommodation_counts: HashMap<AccommodationType, i64> = HashMap::new();
    let mut dietary_counts: HashMap<String, i64> = HashMap::new();
    let mut total_revenue_cents = 0i64;
    let mut paid_count = 0i64;
    let mut checked_in_count = 0i64;

    for registration in registrations {
        *status_counts.entry(registration.status).or_insert(0) += 1;

        if registration.status != RegistrationStatus::Complete {
            continue;
        }

        *accommodation_counts
            .entry(registration.accommodation_type)
            .or_insert(0) += 1;
        if let Some(dietary) = &registration.dietary_restrictions {
            let dietary = dietary.trim();
            if !dietary.is_empty() {
                *dietary_counts.entry(dietary.to_string()).or_insert(0) += 1;
            }
        }

        let payment = registration.payment_amount_cents.unwrap_or(0);
        total_revenue_cents += payment;
        if payment > 0 {
            paid_count += 1;
        }
        if registration.is_checked_in() {
            checked_in_count += 1;
        }
    }

    let status_breakdown = RegistrationStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: status_counts.get(status).copied().unwrap_or(0),
        })
        .collect();

    let accommodation_breakdown = AccommodationType::ALL
        .iter()
        .map(|accommodation_type| AccommodationCount {
            accommodation_type: *accommodation_type,
            count: accommodation_counts
                .get(accommodation_type)
                .copied()
                .unwrap_or(0),
        })
        .collect();

    let mut dietary_summary: Vec<DietaryCount> = dietary_counts
        .into_iter()
        .map(|(dietary, count)| DietaryCount { dietary, count })
        .collect();
    dietary_summary.sort_by(|a, b| b.count.cmp(&a.count).then(a.dietary.cmp(&b.dietary)));

    let average_payment_cents = if paid_count > 0 {
        total_revenue_cents / paid_count
    } else {
        0
    };

    EventDashboard {
        event_id,
        total_registrations: registrations.len() as i64,
        status_breakdown,
        accommodation_breakdown,
        dietary_summary,
        total_revenue_cents,
        average_payment_cents,
        checked_in_count,
    }
}

fn summarize(event: &Event, registrations: &[Registration]) -> EventSummary {
    let complete_count = registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Complete)
        .count() as i64;
    let pending_count = registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::PendingPayment)
        .count() as i64;
    let revenue_cents = registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Complete)
        .filter_map(|r| r.payment_amount_cents)
        .sum();

    EventSummary {
        event_id: event.id,
        name: event.name.clone(),
        slug: event.slug.clone(),
        complete_count,
        pending_count,
        revenue_cents,
        capacity: event.capacity,
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repositories: Repositories,
}

impl DashboardService {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    pub async fn event_dashboard(&self, event_id: Uuid) -> Result<EventDashboard> {
        self.repositories
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(OpsError::EventNotFound { event_id })?;

        let registrations = self
            .repositories
            .registrations
            .list_by_event(event_id)
            .await?;
        Ok(aggregate_event(event_id, &registrations))
    }

    pub async fn overview(&self) -> Result<OrganizationOverview> {
        let events = self
            .repositories
            .events
            .list_by_status(EventStatus::Active)
            .await?;

        let mut summaries = Vec::with_capacity(events.len());
        let mut total_registrations = 0i64;
        let mut total_complete = 0i64;
        let mut total_revenue_cents = 0i64;

        for event in &events {
            let registrations = self
                .repositories
                .registrations
                .list_by_event(event.id)
                .await?;
            let summary = summarize(event, &registrations);
            total_registrations += registrations.len() as i64;
            total_complete += summary.complete_count;
            total_revenue_cents += summary.revenue_cents;
            summaries.push(summary);
        }

        Ok(OrganizationOverview {
            active_events: events.len() as i64,
            total_registrations,
            total_complete,
            total_revenue_cents,
            events: summaries,
        })
    }
}
