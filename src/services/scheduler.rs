//! Expiry and reminder sweep
//!
//! A single periodic task walks every `pending_payment` registration,
//! whatever its event's lifecycle status: sends the one payment reminder
//! per registration once its delay has passed, and expires registrations
//! past their auto-expire window. Both actions race safely against payment
//! callbacks: the reminder marker and the status change are compare-and-set,
//! and a lost expiry race is logged and skipped.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::settings::{NotificationConfig, SchedulerConfig};
use crate::database::repositories::Repositories;
use crate::models::{Event, NewAuditEntry, RegistrationStatus};
use crate::services::notification::{templates, NotificationService};
use crate::utils::errors::{OpsError, Result};
use crate::utils::logging::{log_sweep_result, log_transition_rejected};

/// What one sweep run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub reminders_sent: usize,
    pub expired: usize,
    pub batches_purged: u64,
}

#[derive(Clone)]
pub struct SchedulerService {
    repositories: Repositories,
    notifications: NotificationService,
    scheduler_config: SchedulerConfig,
    notification_config: NotificationConfig,
}

impl SchedulerService {
    pub fn new(
        repositories: Repositories,
        notifications: NotificationService,
        scheduler_config: SchedulerConfig,
        notification_config: NotificationConfig,
    ) -> Self {
        Self {
            repositories,
            notifications,
            scheduler_config,
            notification_config,
        }
    }

    /// Run sweeps forever at the configured interval.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.scheduler_config.sweep_interval_seconds,
        ));
        info!(
            interval_seconds = self.scheduler_config.sweep_interval_seconds,
            "Scheduler started"
        );

        loop {
            interval.tick().await;
            match self.run_sweep(Utc::now()).await {
                Ok(outcome) => log_sweep_result(
                    outcome.reminders_sent,
                    outcome.expired,
                    outcome.batches_purged,
                ),
                Err(e) => error!(error = %e, "Sweep failed"),
            }
        }
    }

    /// One sweep pass. `now` is injected so time-based behavior is testable
    /// without backdating rows.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        // Scoped by registration status alone: an event moved to completed
        // or cancelled must not strand its unpaid registrations.
        let pending = self
            .repositories
            .registrations
            .list_by_status(RegistrationStatus::PendingPayment)
            .await?;

        let mut events: HashMap<Uuid, Event> = HashMap::new();
        for registration in pending {
            if !events.contains_key(&registration.event_id) {
                match self
                    .repositories
                    .events
                    .find_by_id(registration.event_id)
                    .await?
                {
                    Some(event) => {
                        events.insert(event.id, event);
                    }
                    None => {
                        error!(
                            registration_id = %registration.id,
                            event_id = %registration.event_id,
                            "Pending registration references a missing event"
                        );
                        continue;
                    }
                }
            }
            let event = &events[&registration.event_id];

            let age = now - registration.created_at;

            if age >= Duration::hours(event.auto_expire_hours) {
                match self.expire(registration.id, now).await {
                    Ok(true) => outcome.expired += 1,
                    Ok(false) => {}
                    Err(e) => error!(
                        registration_id = %registration.id,
                        error = %e,
                        "Expiry failed"
                    ),
                }
                continue;
            }

            if age >= Duration::minutes(event.reminder_delay_minutes)
                && registration.reminder_sent_at.is_none()
            {
                match self.remind(registration.id, now).await {
                    Ok(true) => outcome.reminders_sent += 1,
                    Ok(false) => {}
                    Err(e) => error!(
                        registration_id = %registration.id,
                        error = %e,
                        "Reminder failed"
                    ),
                }
            }
        }

        let dedup_cutoff = now - Duration::hours(self.notification_config.dedup_window_hours);
        outcome.batches_purged = self
            .repositories
            .notifications
            .purge_batches_before(dedup_cutoff)
            .await?;

        Ok(outcome)
    }

    /// Claim and send the one reminder for a registration. Returns false
    /// when another sweep already claimed it or the registration left
    /// `pending_payment` in the meantime.
    async fn remind(&self, registration_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        if !self
            .repositories
            .registrations
            .claim_reminder(registration_id, now)
            .await?
        {
            return Ok(false);
        }

        if let Some(registration) = self
            .repositories
            .registrations
            .find_by_id(registration_id)
            .await?
        {
            self.notifications
                .send_lifecycle(&registration, templates::PAYMENT_REMINDER)
                .await;
        }
        Ok(true)
    }

    /// Expire one pending registration. A lost race against a concurrent
    /// payment confirmation is expected and harmless.
    async fn expire(&self, registration_id: Uuid, _now: DateTime<Utc>) -> Result<bool> {
        let audit = NewAuditEntry::status_change(
            registration_id,
            "sweep",
            RegistrationStatus::PendingPayment,
            RegistrationStatus::Expired,
        );

        let registration = match self
            .repositories
            .registrations
            .transition_status(
                registration_id,
                RegistrationStatus::PendingPayment,
                RegistrationStatus::Expired,
                None,
                audit,
            )
            .await
        {
            Ok(registration) => registration,
            Err(OpsError::InvalidTransition { from, to }) => {
                log_transition_rejected(registration_id, &from, &to);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        self.notifications
            .send_lifecycle(&registration, templates::EXPIRY_NOTICE)
            .await;
        Ok(true)
    }
}
