//! Notification service
//!
//! Renders templated messages for registrations and drives the bulk
//! dispatcher. Bulk sends snapshot their recipient set up front, attempt
//! every recipient independently (a per-recipient timeout counts as a
//! failure, never aborts the batch), and deduplicate retried requests by
//! idempotency key within a bounded window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::settings::NotificationConfig;
use crate::database::repositories::{BatchBegin, Repositories};
use crate::models::{
    Attendee, BatchOutcome, DeliveryStatus, Event, NewNotificationLogEntry,
    NotificationChannel, NotificationLogEntry, Registration, RegistrationStatus,
};
use crate::services::transport::{MessageTransport, OutboundMessage};
use crate::utils::errors::{OpsError, Result};
use crate::utils::helpers::render_template_text;

/// Built-in lifecycle template keys.
pub mod templates {
    pub const CONFIRMATION: &str = "registration_confirmation";
    pub const PAYMENT_INSTRUCTIONS: &str = "payment_instructions";
    pub const PAYMENT_REMINDER: &str = "payment_reminder";
    pub const EXPIRY_NOTICE: &str = "expiry_notice";
}

/// A bulk send request from an operator.
#[derive(Debug, Clone)]
pub struct BulkSendRequest {
    pub event_id: Uuid,
    /// Recipient filter: registrations in any of these statuses.
    pub statuses: Vec<RegistrationStatus>,
    pub channel: NotificationChannel,
    /// Built-in template key, when no literal body is supplied.
    pub template_key: Option<String>,
    /// Literal body with `{{variable}}` placeholders.
    pub body: Option<String>,
    pub idempotency_key: String,
}

#[derive(Clone)]
pub struct NotificationService {
    repositories: Repositories,
    transport: Arc<dyn MessageTransport>,
    config: NotificationConfig,
    organization_name: String,
    templates: HashMap<String, String>,
}

impl NotificationService {
    pub fn new(
        repositories: Repositories,
        transport: Arc<dyn MessageTransport>,
        config: NotificationConfig,
        organization_name: String,
    ) -> Self {
        Self {
            repositories,
            transport,
            config,
            organization_name,
            templates: Self::default_templates(),
        }
    }

    fn default_templates() -> HashMap<String, String> {
        let mut templates = HashMap::new();
        templates.insert(
            templates::CONFIRMATION.to_string(),
            "Hi {{first_name}}, your registration for {{event_name}} is confirmed. \
             See you on {{event_date}}! — {{organization}}"
                .to_string(),
        );
        templates.insert(
            templates::PAYMENT_INSTRUCTIONS.to_string(),
            "Hi {{first_name}}, your spot for {{event_name}} is held. Please complete \
             your payment of {{amount_due}} to confirm it. — {{organization}}"
                .to_string(),
        );
        templates.insert(
            templates::PAYMENT_REMINDER.to_string(),
            "Hi {{first_name}}, a reminder that your registration for {{event_name}} \
             is awaiting payment of {{amount_due}}. — {{organization}}"
                .to_string(),
        );
        templates.insert(
            templates::EXPIRY_NOTICE.to_string(),
            "Hi {{first_name}}, your unpaid registration for {{event_name}} has \
             expired. You are welcome to register again. — {{organization}}"
                .to_string(),
        );
        templates
    }

    fn variables(
        &self,
        event: &Event,
        attendee: &Attendee,
        registration: &Registration,
    ) -> HashMap<String, String> {
        let amount_due = format!(
            "${}.{:02}",
            registration.amount_due_cents / 100,
            registration.amount_due_cents % 100
        );
        let mut variables = HashMap::new();
        variables.insert("first_name".to_string(), attendee.first_name.clone());
        variables.insert("last_name".to_string(), attendee.last_name.clone());
        variables.insert("full_name".to_string(), attendee.full_name());
        variables.insert("email".to_string(), attendee.email.clone());
        variables.insert("event_name".to_string(), event.name.clone());
        variables.insert(
            "event_date".to_string(),
            event.event_date.format("%Y-%m-%d").to_string(),
        );
        variables.insert("amount_due".to_string(), amount_due);
        variables.insert("organization".to_string(), self.organization_name.clone());
        variables
    }

    /// Render and send one message to the attendee behind a registration,
    /// recording the attempt in the send log. A transport failure or
    /// timeout is returned as `Failed`, never as an error.
    pub async fn send_to_registration(
        &self,
        registration: &Registration,
        channel: NotificationChannel,
        template_key: &str,
        body_template: &str,
    ) -> Result<DeliveryStatus> {
        let attendee = self
            .repositories
            .attendees
            .find_by_id(registration.attendee_id)
            .await?
            .ok_or(OpsError::AttendeeNotFound {
                attendee_id: registration.attendee_id,
            })?;
        let event = self
            .repositories
            .events
            .find_by_id(registration.event_id)
            .await?
            .ok_or(OpsError::EventNotFound {
                event_id: registration.event_id,
            })?;

        let variables = self.variables(&event, &attendee, registration);
        let body = render_template_text(body_template, &variables);
        let message = OutboundMessage {
            channel,
            email: channel.includes_email().then(|| attendee.email.clone()),
            phone: if channel.includes_sms() {
                attendee.phone.clone()
            } else {
                None
            },
            body,
        };

        let timeout = std::time::Duration::from_secs(self.config.send_timeout_seconds);
        let status = match tokio::time::timeout(timeout, self.transport.send(&message)).await {
            Ok(Ok(())) => DeliveryStatus::Delivered,
            Ok(Err(e)) => {
                warn!(registration_id = %registration.id, error = %e, "Message send failed");
                DeliveryStatus::Failed
            }
            Err(_) => {
                warn!(registration_id = %registration.id, "Message send timed out");
                DeliveryStatus::Failed
            }
        };

        self.repositories
            .notifications
            .append_log(NewNotificationLogEntry {
                registration_id: registration.id,
                channel,
                template_key: template_key.to_string(),
                status,
            })
            .await?;

        Ok(status)
    }

    /// Lifecycle send by built-in template key. Delivery problems are
    /// logged, not propagated, so a transport outage never fails the
    /// state change that triggered the message.
    pub async fn send_lifecycle(&self, registration: &Registration, template_key: &str) {
        let Some(body_template) = self.templates.get(template_key).cloned() else {
            warn!(template_key, "Unknown lifecycle template");
            return;
        };

        match self
            .send_to_registration(
                registration,
                NotificationChannel::Email,
                template_key,
                &body_template,
            )
            .await
        {
            Ok(DeliveryStatus::Delivered) => {
                debug!(registration_id = %registration.id, template_key, "Lifecycle message delivered");
            }
            Ok(DeliveryStatus::Failed) => {
                warn!(registration_id = %registration.id, template_key, "Lifecycle message failed");
            }
            Err(e) => {
                warn!(registration_id = %registration.id, template_key, error = %e, "Lifecycle send error");
            }
        }
    }

    /// Dispatch one bulk send, deduplicated by idempotency key.
    ///
    /// `now` is injected so the dedup window bound is testable.
    pub async fn send_bulk(
        &self,
        request: BulkSendRequest,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome> {
        let body_template = match (&request.body, &request.template_key) {
            (Some(body), _) => body.clone(),
            (None, Some(key)) => self
                .templates
                .get(key)
                .cloned()
                .ok_or_else(|| OpsError::InvalidInput(format!("unknown template key: {key}")))?,
            (None, None) => {
                return Err(OpsError::InvalidInput(
                    "bulk send requires a template key or a body".to_string(),
                ))
            }
        };
        let template_key = request
            .template_key
            .clone()
            .unwrap_or_else(|| "custom".to_string());

        let window = Duration::hours(self.config.dedup_window_hours);
        let begin = self
            .repositories
            .notifications
            .try_begin_batch(
                &request.idempotency_key,
                request.event_id,
                request.channel,
                now,
                window,
            )
            .await?;

        if let BatchBegin::Duplicate(batch) = begin {
            info!(
                idempotency_key = %request.idempotency_key,
                "Bulk send deduplicated by idempotency key"
            );
            return Ok(BatchOutcome {
                sent_count: batch.sent_count,
                failed_count: batch.failed_count,
                deduplicated: true,
            });
        }

        // Snapshot the recipient set once; registrations changing status
        // mid-send stay in or out of this batch as captured here.
        let recipients = self
            .repositories
            .registrations
            .list_by_event_and_statuses(request.event_id, &request.statuses)
            .await?;

        info!(
            event_id = %request.event_id,
            recipients = recipients.len(),
            channel = %request.channel,
            "Dispatching bulk send"
        );

        let mut sent_count = 0;
        let mut failed_count = 0;
        for registration in &recipients {
            match self
                .send_to_registration(registration, request.channel, &template_key, &body_template)
                .await
            {
                Ok(DeliveryStatus::Delivered) => sent_count += 1,
                Ok(DeliveryStatus::Failed) => failed_count += 1,
                Err(e) => {
                    warn!(registration_id = %registration.id, error = %e, "Bulk recipient skipped");
                    failed_count += 1;
                }
            }

            if self.config.throttle_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.throttle_ms))
                    .await;
            }
        }

        self.repositories
            .notifications
            .complete_batch(&request.idempotency_key, sent_count, failed_count)
            .await?;

        Ok(BatchOutcome {
            sent_count,
            failed_count,
            deduplicated: false,
        })
    }

    /// Send log for an event, newest first.
    pub async fn send_log(&self, event_id: Uuid, limit: i64) -> Result<Vec<NotificationLogEntry>> {
        self.repositories
            .notifications
            .list_log_for_event(event_id, limit)
            .await
    }
}
