//! Bulk notification dispatcher integration tests

mod helpers;

use chrono::{Duration, Utc};

use helpers::{create_active_event, submission, test_context, TestContext};
use retreat_ops::models::{NotificationChannel, PricingModel, RegistrationStatus};
use retreat_ops::services::BulkSendRequest;

fn bulk_request(event_id: uuid::Uuid, key: &str) -> BulkSendRequest {
    BulkSendRequest {
        event_id,
        statuses: vec![RegistrationStatus::Complete],
        channel: NotificationChannel::Email,
        template_key: None,
        body: Some("Hi {{first_name}}, gates open at noon.".to_string()),
        idempotency_key: key.to_string(),
    }
}

async fn seed_complete_registrations(ctx: &TestContext, slug: &str, count: usize) {
    for _ in 0..count {
        ctx.services
            .registrations
            .submit(submission(slug))
            .await
            .unwrap();
    }
    ctx.transport.clear();
}

#[tokio::test]
async fn test_same_key_sends_once() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 3).await;

    let now = Utc::now();
    let first = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), now)
        .await
        .unwrap();
    assert_eq!(first.sent_count, 3);
    assert_eq!(first.failed_count, 0);
    assert!(!first.deduplicated);
    assert_eq!(ctx.transport.sent_count(), 3);

    // Retried key: recorded outcome, nothing sent
    let second = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), now + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(second.sent_count, 3);
    assert!(second.deduplicated);
    assert_eq!(ctx.transport.sent_count(), 3);
}

#[tokio::test]
async fn test_different_keys_send_twice() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 2).await;

    let now = Utc::now();
    ctx.services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), now)
        .await
        .unwrap();
    ctx.services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-2"), now)
        .await
        .unwrap();

    assert_eq!(ctx.transport.sent_count(), 4);
}

#[tokio::test]
async fn test_key_expires_after_dedup_window() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 1).await;

    let now = Utc::now();
    ctx.services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), now)
        .await
        .unwrap();

    // Same key past the 24h window is treated as a new request
    let later = now + Duration::hours(25);
    let outcome = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), later)
        .await
        .unwrap();
    assert!(!outcome.deduplicated);
    assert_eq!(ctx.transport.sent_count(), 2);
}

#[tokio::test]
async fn test_recipient_failures_are_tallied_not_raised() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 3).await;

    ctx.transport.fail_all(true);
    let outcome = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome.sent_count, 0);
    assert_eq!(outcome.failed_count, 3);

    // The dedup record keeps the failed outcome
    let replay = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), Utc::now())
        .await
        .unwrap();
    assert!(replay.deduplicated);
    assert_eq!(replay.failed_count, 3);
}

#[tokio::test]
async fn test_unknown_tokens_left_verbatim() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 1).await;

    let mut request = bulk_request(event.id, "announce-1");
    request.body = Some("Hi {{first_name}}, ref {{booking_code}}.".to_string());
    ctx.services
        .notifications
        .send_bulk(request, Utc::now())
        .await
        .unwrap();

    let sent = ctx.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].body.contains("{{first_name}}"));
    assert!(sent[0].body.contains("{{booking_code}}"));
}

#[tokio::test]
async fn test_recipient_filter_snapshot() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;

    // One complete, one still pending
    let paid = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.services
        .registrations
        .on_payment_confirmed(paid.id, 5000)
        .await
        .unwrap();
    ctx.services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.transport.clear();

    let outcome = ctx
        .services
        .notifications
        .send_bulk(bulk_request(event.id, "paid-only"), Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome.sent_count, 1);
    assert_eq!(ctx.transport.sent_count(), 1);
}

#[tokio::test]
async fn test_send_log_records_attempts() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    seed_complete_registrations(&ctx, &event.slug, 2).await;

    ctx.services
        .notifications
        .send_bulk(bulk_request(event.id, "announce-1"), Utc::now())
        .await
        .unwrap();

    let log = ctx.services.notifications.send_log(event.id, 50).await.unwrap();
    // 2 confirmations from submission + 2 bulk sends
    assert_eq!(log.len(), 4);
}
