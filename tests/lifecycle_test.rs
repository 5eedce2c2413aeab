//! Registration lifecycle integration tests

mod helpers;

use assert_matches::assert_matches;

use helpers::{create_active_event, submission, test_context};
use retreat_ops::models::{
    audit_actions, PricingModel, RegistrationStatus, UpdateRegistrationRequest,
};
use retreat_ops::utils::errors::OpsError;

#[tokio::test]
async fn test_free_event_completes_immediately() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;

    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    assert_eq!(registration.status, RegistrationStatus::Complete);
    assert_eq!(registration.amount_due_cents, 0);
    assert_eq!(registration.payment_amount_cents, Some(0));

    // Confirmation went out
    assert_eq!(ctx.transport.sent_count(), 1);
}

#[tokio::test]
async fn test_paid_submission_starts_pending() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(12500)).await;

    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    assert_eq!(registration.status, RegistrationStatus::PendingPayment);
    assert_eq!(registration.amount_due_cents, 12500);
    assert_eq!(registration.payment_amount_cents, None);

    // Creation is audited
    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, audit_actions::CREATE);
}

#[tokio::test]
async fn test_payment_confirmation_completes_registration() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(12500)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let completed = ctx
        .services
        .registrations
        .on_payment_confirmed(registration.id, 12500)
        .await
        .unwrap();

    assert_eq!(completed.status, RegistrationStatus::Complete);
    assert_eq!(completed.payment_amount_cents, Some(12500));

    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    assert_eq!(audit.len(), 2);
    // Newest first
    assert_eq!(audit[0].action, audit_actions::UPDATE_STATUS);
}

#[tokio::test]
async fn test_duplicate_payment_callback_is_noop() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(12500)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 12500)
        .await
        .unwrap();
    let audit_before = ctx.services.audit_log(registration.id, 10).await.unwrap();

    // Replay with the same amount: no-op, no extra audit entry
    let replayed = ctx
        .services
        .registrations
        .on_payment_confirmed(registration.id, 12500)
        .await
        .unwrap();
    assert_eq!(replayed.status, RegistrationStatus::Complete);

    let audit_after = ctx.services.audit_log(registration.id, 10).await.unwrap();
    assert_eq!(audit_before.len(), audit_after.len());

    // Replay with a different amount: surfaced for review, nothing mutated
    let err = ctx
        .services
        .registrations
        .on_payment_confirmed(registration.id, 10000)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        OpsError::AmountMismatch {
            received_cents: 10000,
            recorded_cents: 12500
        }
    );
    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.payment_amount_cents, Some(12500));
}

#[tokio::test]
async fn test_underpayment_rejected() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(12500)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let err = ctx
        .services
        .registrations
        .on_payment_confirmed(registration.id, 10000)
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::AmountMismatch { .. });

    let current = ctx.services.registrations.get(registration.id).await.unwrap();
    assert_eq!(current.status, RegistrationStatus::PendingPayment);
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    ctx.services
        .registrations
        .cancel(registration.id, "operator")
        .await
        .unwrap();

    let err = ctx
        .services
        .registrations
        .on_payment_confirmed(registration.id, 5000)
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::InvalidTransition { .. });

    let err = ctx
        .services
        .registrations
        .refund(registration.id, "operator")
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::InvalidTransition { .. });
}

#[tokio::test]
async fn test_refund_requires_complete() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let err = ctx
        .services
        .registrations
        .refund(registration.id, "operator")
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::InvalidTransition { .. });

    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 5000)
        .await
        .unwrap();
    let refunded = ctx
        .services
        .registrations
        .refund(registration.id, "operator")
        .await
        .unwrap();
    assert_eq!(refunded.status, RegistrationStatus::Refunded);
    // The payment record survives the refund
    assert_eq!(refunded.payment_amount_cents, Some(5000));
}

#[tokio::test]
async fn test_duplicate_submission_rejected() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;

    let mut request = submission(&event.slug);
    request.email = "ana@example.com".to_string();
    ctx.services.registrations.submit(request.clone()).await.unwrap();

    // Same email, normalized differently
    request.email = "  Ana@Example.COM ".to_string();
    let err = ctx.services.registrations.submit(request).await.unwrap_err();
    assert_matches!(err, OpsError::DuplicateRegistration);
}

#[tokio::test]
async fn test_capacity_guard() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    ctx.services
        .repositories
        .events
        .update(
            event.id,
            retreat_ops::models::UpdateEventRequest {
                capacity: Some(Some(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    ctx.services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    let err = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::EventAtCapacity);
}

#[tokio::test]
async fn test_draft_event_rejects_submissions() {
    let ctx = test_context();
    let event = ctx
        .services
        .repositories
        .events
        .create(retreat_ops::models::CreateEventRequest {
            name: "Unpublished".to_string(),
            slug: "unpublished".to_string(),
            description: None,
            event_date: chrono::Utc::now(),
            pricing_model: PricingModel::Free,
            fixed_price_cents: None,
            min_donation_cents: None,
            capacity: None,
            reminder_delay_minutes: 60,
            auto_expire_hours: 24,
        })
        .await
        .unwrap();

    let err = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::EventNotActive { .. });
}

#[tokio::test]
async fn test_cancellation_request_flag_and_resolution() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 5000)
        .await
        .unwrap();

    let flagged = ctx
        .services
        .registrations
        .request_cancellation(registration.id, "attendee")
        .await
        .unwrap();
    assert!(flagged.cancellation_requested);
    assert_eq!(flagged.status, RegistrationStatus::Complete);

    let cancelled = ctx
        .services
        .registrations
        .cancel(registration.id, "operator")
        .await
        .unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);

    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&audit_actions::CANCELLATION_REQUESTED));
}

#[tokio::test]
async fn test_operator_edit_audited_with_snapshots() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let updated = ctx
        .services
        .registrations
        .update_details(
            registration.id,
            UpdateRegistrationRequest {
                dietary_restrictions: Some(Some("vegan".to_string())),
                ..Default::default()
            },
            "operator",
        )
        .await
        .unwrap();
    assert_eq!(updated.dietary_restrictions.as_deref(), Some("vegan"));

    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    let edit = audit
        .iter()
        .find(|e| e.action == audit_actions::UPDATE)
        .expect("edit audited");
    assert_eq!(
        edit.new_value.as_ref().unwrap()["dietary_restrictions"],
        serde_json::json!("vegan")
    );
    assert_eq!(
        edit.old_value.as_ref().unwrap()["dietary_restrictions"],
        serde_json::Value::Null
    );
}

#[tokio::test]
async fn test_concurrent_scholarship_redemptions_respect_max_uses() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(10000)).await;
    ctx.services
        .pricing
        .create_scholarship_link(
            retreat_ops::models::CreateScholarshipLinkRequest {
                code: Some("SCH-LASTSLOT".to_string()),
                event_id: event.id,
                override_price_cents: 1000,
                max_uses: 1,
            },
            "operator",
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let scholarships = ctx.services.repositories.scholarships.clone();
        handles.push(tokio::spawn(async move {
            scholarships.redeem("SCH-LASTSLOT").await
        }));
    }

    let mut successes = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(OpsError::ScholarshipExhausted { .. }) => exhausted += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(exhausted, 7);

    let link = ctx
        .services
        .repositories
        .scholarships
        .find_by_code("SCH-LASTSLOT")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.uses, 1);
}
