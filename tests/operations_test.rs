//! Check-in, dashboard, export and audit query integration tests

mod helpers;

use assert_matches::assert_matches;

use helpers::{create_active_event, submission, test_context};
use retreat_ops::models::{
    audit_actions, AccommodationType, PricingModel, RegistrationStatus,
    UpdateRegistrationRequest,
};
use retreat_ops::utils::errors::OpsError;

#[tokio::test]
async fn test_check_in_requires_complete() {
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
        .checkin
        .check_in(registration.id, "gate")
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::NotEligible { .. });

    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 5000)
        .await
        .unwrap();
    let checked = ctx
        .services
        .checkin
        .check_in(registration.id, "gate")
        .await
        .unwrap();
    assert!(checked.checked_in_at.is_some());
    assert_eq!(checked.checked_in_by.as_deref(), Some("gate"));
}

#[tokio::test]
async fn test_concurrent_check_in_both_succeed() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    let a = ctx.services.checkin.clone();
    let b = ctx.services.checkin.clone();
    let id = registration.id;
    let (first, second) = tokio::join!(
        a.check_in(id, "gate-a"),
        b.check_in(id, "gate-b")
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    let current = ctx.services.registrations.get(id).await.unwrap();
    assert!(current.checked_in_at.is_some());
}

#[tokio::test]
async fn test_undo_then_check_in_again() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Free, None).await;
    let registration = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();

    // Undo before any check-in is a guard violation
    let err = ctx
        .services
        .checkin
        .undo_check_in(registration.id, "gate")
        .await
        .unwrap_err();
    assert_matches!(err, OpsError::NotCheckedIn { .. });

    ctx.services
        .checkin
        .check_in(registration.id, "gate")
        .await
        .unwrap();
    let undone = ctx
        .services
        .checkin
        .undo_check_in(registration.id, "gate")
        .await
        .unwrap();
    assert!(undone.checked_in_at.is_none());
    assert!(undone.checked_in_by.is_none());

    let again = ctx
        .services
        .checkin
        .check_in(registration.id, "gate")
        .await
        .unwrap();
    assert!(again.checked_in_at.is_some());

    let audit = ctx.services.audit_log(registration.id, 20).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions
            .iter()
            .filter(|a| **a == audit_actions::CHECK_IN)
            .count(),
        2
    );
    assert_eq!(
        actions
            .iter()
            .filter(|a| **a == audit_actions::UNDO_CHECK_IN)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_dashboard_counts_and_revenue() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(10000)).await;

    // Two paid, one pending
    for _ in 0..2 {
        let registration = ctx
            .services
            .registrations
            .submit(submission(&event.slug))
            .await
            .unwrap();
        ctx.services
            .registrations
            .on_payment_confirmed(registration.id, 10000)
            .await
            .unwrap();
    }
    let pending = ctx
        .services
        .registrations
        .submit(submission(&event.slug))
        .await
        .unwrap();
    ctx.services
        .registrations
        .update_details(
            pending.id,
            UpdateRegistrationRequest {
                dietary_restrictions: Some(Some("vegan".to_string())),
                ..Default::default()
            },
            "operator",
        )
        .await
        .unwrap();

    let dashboard = ctx.services.dashboard.event_dashboard(event.id).await.unwrap();
    assert_eq!(dashboard.total_registrations, 3);

    let count_for = |status: RegistrationStatus| {
        dashboard
            .status_breakdown
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.count)
            .unwrap()
    };
    assert_eq!(count_for(RegistrationStatus::Complete), 2);
    assert_eq!(count_for(RegistrationStatus::PendingPayment), 1);
    assert_eq!(count_for(RegistrationStatus::Expired), 0);

    assert_eq!(dashboard.total_revenue_cents, 20000);
    assert_eq!(dashboard.average_payment_cents, 10000);

    // Pending dietary text stays out of logistics
    assert!(dashboard.dietary_summary.is_empty());
    let accommodation_total: i64 = dashboard
        .accommodation_breakdown
        .iter()
        .map(|c| c.count)
        .sum();
    assert_eq!(accommodation_total, 2);
}

#[tokio::test]
async fn test_overview_spans_active_events() {
    let ctx = test_context();
    let event_a = create_active_event(&ctx.services, PricingModel::Free, None).await;
    let event_b = create_active_event(&ctx.services, PricingModel::Free, None).await;

    ctx.services
        .registrations
        .submit(submission(&event_a.slug))
        .await
        .unwrap();
    ctx.services
        .registrations
        .submit(submission(&event_b.slug))
        .await
        .unwrap();

    let overview = ctx.services.dashboard.overview().await.unwrap();
    assert_eq!(overview.active_events, 2);
    assert_eq!(overview.total_registrations, 2);
    assert_eq!(overview.total_complete, 2);
}

#[tokio::test]
async fn test_csv_export_rows() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(7500)).await;

    let mut request = submission(&event.slug);
    request.email = "ana@example.com".to_string();
    request.first_name = "Ana".to_string();
    request.last_name = "Moreno".to_string();
    request.accommodation_type = AccommodationType::BellTent;
    request.dietary_restrictions = Some("vegetarian".to_string());
    let registration = ctx.services.registrations.submit(request).await.unwrap();
    ctx.services
        .registrations
        .on_payment_confirmed(registration.id, 7500)
        .await
        .unwrap();

    let csv = ctx.services.export.export_event_csv(event.id).await.unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "name,email,phone,status,amount_cents,accommodation,dietary,source,created_at"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("Ana Moreno,ana@example.com,+15551234567,complete,7500,bell_tent,vegetarian,registration_form,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_audit_query_newest_first() {
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
    ctx.services
        .checkin
        .check_in(registration.id, "gate")
        .await
        .unwrap();

    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            audit_actions::CHECK_IN,
            audit_actions::UPDATE_STATUS,
            audit_actions::CREATE
        ]
    );
    for pair in audit.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

#[tokio::test]
async fn test_manual_entry_and_roster() {
    let ctx = test_context();
    let event = create_active_event(&ctx.services, PricingModel::Fixed, Some(5000)).await;

    let registration = ctx
        .services
        .registrations
        .manual_entry(retreat_ops::services::ManualEntryRequest {
            event_id: event.id,
            email: "door@example.com".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Walker".to_string(),
            phone: None,
            accommodation_type: AccommodationType::DayOnly,
            dietary_restrictions: None,
            source: retreat_ops::models::RegistrationSource::WalkIn,
            amount_cents: 5000,
            paid: true,
            notes: Some("paid cash at the gate".to_string()),
            actor: "gate".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(registration.status, RegistrationStatus::Complete);
    assert_eq!(registration.payment_amount_cents, Some(5000));

    let audit = ctx.services.audit_log(registration.id, 10).await.unwrap();
    assert_eq!(audit[0].action, audit_actions::MANUAL_ENTRY);

    let roster = ctx.services.checkin.roster(event.id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].attendee.email, "door@example.com");
}
