//! Seed-data builders for integration tests

use chrono::{Duration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use retreat_ops::models::{
    AccommodationType, CreateEventRequest, Event, EventStatus, PricingModel, UpdateEventRequest,
};
use retreat_ops::services::{ServiceFactory, SubmitRegistrationRequest};

/// Create an event and move it to `active` so it accepts registrations.
pub async fn create_active_event(
    services: &ServiceFactory,
    pricing_model: PricingModel,
    fixed_price_cents: Option<i64>,
) -> Event {
    let slug = format!("retreat-{}", uuid::Uuid::new_v4());
    let event = services
        .repositories
        .events
        .create(CreateEventRequest {
            name: "Forest Retreat".to_string(),
            slug,
            description: None,
            event_date: Utc::now() + Duration::days(30),
            pricing_model,
            fixed_price_cents,
            min_donation_cents: None,
            capacity: None,
            reminder_delay_minutes: 60,
            auto_expire_hours: 24,
        })
        .await
        .expect("event created");

    services
        .repositories
        .events
        .update(
            event.id,
            UpdateEventRequest {
                status: Some(EventStatus::Active),
                ..Default::default()
            },
        )
        .await
        .expect("event activated")
}

/// A submission for the given event slug with generated attendee details.
pub fn submission(event_slug: &str) -> SubmitRegistrationRequest {
    SubmitRegistrationRequest {
        event_slug: event_slug.to_string(),
        email: SafeEmail().fake(),
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
        phone: Some("555-123-4567".to_string()),
        accommodation_type: AccommodationType::SelfCamping,
        dietary_restrictions: None,
        scholarship_code: None,
        donation_amount_cents: None,
    }
}
