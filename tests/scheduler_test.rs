//! Expiry and reminder sweep integration tests

mod helpers;

use chrono::{Duration, Utc};

use helpers::{create_active_event, submission, test_context};
use retreat_ops::models::{EventStatus, PricingModel, RegistrationStatus, UpdateEventRequest};

#[tokio::test]
async fn test_sweep_before_deadlines_does_nothing() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.transport.clear();

    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::minutes(30))
        .await
        .unwrap();

    assert_eq!(outcome.reminders_sent, 0);
    assert_eq!(outcome.expired, 0);
    assert_eq!(ctx.transport.sent_count(), 0);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::PendingPayment);
}

#[tokio::test]
async fn test_reminder_sent_exactly_once() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.transport.clear();

    // Past the reminder delay (60 minutes), before expiry (24 hours)
    let sweep_time = Utc::now() + Duration::hours(2);
    let outcome = ctx.services.scheduler.run_sweep(sweep_time).await.unwrap();
    assert_eq!(outcome.reminders_sent, 1);
    assert_eq!(ctx.transport.sent_count(), 1);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert!(current.reminder_sent_at.is_some());

    // A later sweep does not remind again
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(sweep_time + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(outcome.reminders_sent, 0);
    assert_eq!(ctx.transport.sent_count(), 1);
}

#[tokio::test]
async fn test_expiry_window() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.transport.clear();

    // T0+23h: reminder fires (first sweep past the delay), no expiry
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(23))
        .await
        .unwrap();
    assert_eq!(outcome.expired, 0);
    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::PendingPayment);
    ctx.transport.clear();

    // T0+25h: expires and sends exactly one notice
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(outcome.expired, 1);
    assert_eq!(ctx.transport.sent_count(), 1);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::Expired);

    // A further sweep finds nothing pending
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(26))
        .await
        .unwrap();
    assert_eq!(outcome.expired, 0);
    assert_eq!(ctx.transport.sent_count(), 1);
}

#[tokio::test]
async fn test_sweep_expires_pending_on_completed_event() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    // Event wraps up while the registration is still unpaid
    ctx.services
        .repositories
        .events
        .update(
            event.id,
            UpdateEventRequest {
                status: Some(EventStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ctx.transport.clear();

    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(48))
        .await
        .unwrap();
    assert_eq!(outcome.expired, 1);
    assert_eq!(ctx.transport.sent_count(), 1);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::Expired);
}

#[tokio::test]
async fn test_sweep_reminds_pending_on_cancelled_event() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    ctx.services
        .repositories
        .events
        .update(
            event.id,
            UpdateEventRequest {
                status: Some(EventStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ctx.transport.clear();

    // Past the reminder delay, before expiry
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(outcome.reminders_sent, 1);
    assert_eq!(ctx.transport.sent_count(), 1);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert!(current.reminder_sent_at.is_some());
}

#[tokio::test]
async fn test_completed_registration_skipped_by_sweep() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    // Payment lands before the expiry sweep runs
    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 5000)
        .await
        .unwrap();
    ctx.transport.clear();

    let outcome = ctx
        .services
        .scheduler
        .run_sweep(Utc::now() + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(outcome.expired, 0);
    assert_eq!(ctx.transport.sent_count(), 0);

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::Complete);
}

#[tokio::test]
async fn test_sweep_purges_stale_batches() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    ctx.services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let now = Utc::now();
    ctx.services
        .notifications
        .send_bulk(
            retreat_ops::services::BulkSendRequest {
                event_id: event.id,
                statuses: vec![RegistrationStatus::Complete],
                channel: retreat_ops::models::NotificationChannel::Email,
                template_key: None,
                body: Some("Hello {{first_name}}".to_string()),
                idempotency_key: "stale-key".to_string(),
            },
            now,
        )
        .await
        .unwrap();

    // Inside the 24h window the batch record survives
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(outcome.batches_purged, 0);

    // Beyond the window it is purged
    let outcome = ctx
        .services
        .scheduler
        .run_sweep(now + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(outcome.batches_purged, 1);
}
