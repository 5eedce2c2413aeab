//! Services module
//!
//! Business logic for the registration lifecycle engine: pricing,
//! submission and transitions, scheduling, check-in, dashboards,
//! notifications, and export.

pub mod checkin;
pub mod dashboard;
pub mod export;
pub mod notification;
pub mod pricing;
pub mod registration;
pub mod scheduler;
pub mod transport;

pub use checkin::{CheckInService, RosterEntry};
pub use dashboard::{aggregate_event, DashboardService, EventDashboard, OrganizationOverview};
pub use export::ExportService;
pub use notification::{BulkSendRequest, NotificationService};
pub use pricing::{PricingService, ResolvedPrice};
pub use registration::{ManualEntryRequest, RegistrationService, SubmitRegistrationRequest};
pub use scheduler::{SchedulerService, SweepOutcome};
pub use transport::{MessageTransport, OutboundMessage, WebhookTransport};

use std::sync::Arc;

use uuid::Uuid;

use crate::config::settings::Settings;
use crate::database::repositories::Repositories;
use crate::models::AuditLogEntry;
use crate::utils::errors::Result;

/// Service factory wiring all services over one repository set.
#[derive(Clone)]
pub struct ServiceFactory {
    pub repositories: Repositories,
    pub pricing: PricingService,
    pub registrations: RegistrationService,
    pub checkin: CheckInService,
    pub dashboard: DashboardService,
    pub notifications: NotificationService,
    pub scheduler: SchedulerService,
    pub export: ExportService,
}

impl ServiceFactory {
    pub fn new(
        settings: &Settings,
        repositories: Repositories,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let pricing = PricingService::new(
            repositories.scholarships.clone(),
            repositories.memberships.clone(),
        );
        let notifications = NotificationService::new(
            repositories.clone(),
            transport,
            settings.notifications.clone(),
            settings.app.organization_name.clone(),
        );
        let registrations = RegistrationService::new(
            repositories.clone(),
            pricing.clone(),
            notifications.clone(),
        );
        let checkin = CheckInService::new(repositories.clone());
        let dashboard = DashboardService::new(repositories.clone());
        let scheduler = SchedulerService::new(
            repositories.clone(),
            notifications.clone(),
            settings.scheduler.clone(),
            settings.notifications.clone(),
        );
        let export = ExportService::new(repositories.clone());

        Self {
            repositories,
            pricing,
            registrations,
            checkin,
            dashboard,
            notifications,
            scheduler,
            export,
        }
    }

    /// Audit trail for one entity, newest first.
    pub async fn audit_log(&self, entity_id: Uuid, limit: i64) -> Result<Vec<AuditLogEntry>> {
        self.repositories.audit.list_for_entity(entity_id, limit).await
    }
}
