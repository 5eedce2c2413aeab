//! Pricing and discount resolution
//!
//! Resolution order: pricing model decides the base price, a scholarship
//! override replaces a fixed/donation base, and an active membership
//! discount applies last, floored at zero. Scholarship redemption is an
//! atomic increment and happens only here, once per successful resolution.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::database::repositories::{MembershipRepository, ScholarshipRepository};
use crate::models::{
    audit_actions, CreateMembershipRequest, CreateScholarshipLinkRequest, Event, Membership,
    NewAuditEntry, PricingModel, ScholarshipLink,
};
use crate::utils::errors::{OpsError, Result};

/// Result of resolving the amount owed for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub amount_due_cents: i64,
    pub member_discount_applied: bool,
    /// The code redeemed during resolution, when one was supplied.
    pub scholarship_code: Option<String>,
}

#[derive(Clone)]
pub struct PricingService {
    scholarships: Arc<dyn ScholarshipRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl PricingService {
    pub fn new(
        scholarships: Arc<dyn ScholarshipRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            scholarships,
            memberships,
        }
    }

    /// Resolve the final amount owed. Redeems the scholarship code as a side
    /// effect, so callers must run all other submission guards first.
    pub async fn resolve(
        &self,
        event: &Event,
        attendee_id: Uuid,
        scholarship_code: Option<&str>,
        donation_amount_cents: Option<i64>,
    ) -> Result<ResolvedPrice> {
        let base_cents = match event.pricing_model {
            PricingModel::Free => 0,
            PricingModel::Fixed | PricingModel::Donation => {
                match scholarship_code {
                    Some(code) => self.redeem_for_event(event, code).await?,
                    None => self.base_price(event, donation_amount_cents)?,
                }
            }
        };

        // Membership discount applies last, on top of any scholarship
        // override, and never takes the price below zero.
        let membership = self.memberships.find_active_for_attendee(attendee_id).await?;
        let (amount_due_cents, member_discount_applied) = match membership {
            Some(membership) if base_cents > 0 => (
                (base_cents - membership.discount_value_cents).max(0),
                true,
            ),
            _ => (base_cents, false),
        };

        debug!(
            event_id = %event.id,
            %attendee_id,
            base_cents,
            amount_due_cents,
            member_discount_applied,
            "Resolved registration price"
        );

        Ok(ResolvedPrice {
            amount_due_cents,
            member_discount_applied,
            scholarship_code: scholarship_code.map(|c| c.to_string()),
        })
    }

    fn base_price(&self, event: &Event, donation_amount_cents: Option<i64>) -> Result<i64> {
        match event.pricing_model {
            PricingModel::Free => Ok(0),
            PricingModel::Fixed => event.fixed_price_cents.ok_or_else(|| {
                OpsError::InvalidInput(format!(
                    "event {} has no fixed price configured",
                    event.slug
                ))
            }),
            PricingModel::Donation => {
                let amount_cents = donation_amount_cents.ok_or_else(|| {
                    OpsError::InvalidInput("donation amount is required".to_string())
                })?;
                let minimum_cents = event.effective_min_donation_cents();
                if amount_cents < minimum_cents {
                    return Err(OpsError::BelowMinimum {
                        amount_cents,
                        minimum_cents,
                    });
                }
                Ok(amount_cents)
            }
        }
    }

    /// Create a scholarship link, generating a code when none is supplied.
    pub async fn create_scholarship_link(
        &self,
        request: CreateScholarshipLinkRequest,
        actor: &str,
    ) -> Result<ScholarshipLink> {
        let event_id = request.event_id;
        let max_uses = request.max_uses;
        let override_price_cents = request.override_price_cents;
        let audit = NewAuditEntry::new(
            "scholarship_link",
            event_id,
            audit_actions::SCHOLARSHIP_CREATED,
            actor,
        )
        .with_new_value(serde_json::json!({
            "event_id": event_id,
            "override_price_cents": override_price_cents,
            "max_uses": max_uses,
        }));
        self.scholarships.create(request, audit).await
    }

    pub async fn list_scholarship_links(&self, event_id: Uuid) -> Result<Vec<ScholarshipLink>> {
        self.scholarships.list_by_event(event_id).await
    }

    pub async fn deactivate_scholarship_link(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<ScholarshipLink> {
        let audit = NewAuditEntry::new(
            "scholarship_link",
            id,
            audit_actions::SCHOLARSHIP_DEACTIVATED,
            actor,
        );
        self.scholarships.deactivate(id, audit).await
    }

    /// Grant a membership, superseding any prior active one.
    pub async fn create_membership(
        &self,
        request: CreateMembershipRequest,
        actor: &str,
    ) -> Result<Membership> {
        let audit = NewAuditEntry::new(
            "membership",
            request.attendee_id,
            audit_actions::MEMBERSHIP_CREATED,
            actor,
        )
        .with_new_value(serde_json::json!({
            "attendee_id": request.attendee_id,
            "discount_value_cents": request.discount_value_cents,
        }));
        self.memberships.create(request, audit).await
    }

    pub async fn list_memberships(&self, attendee_id: Uuid) -> Result<Vec<Membership>> {
        self.memberships.list_for_attendee(attendee_id).await
    }

    pub async fn deactivate_membership(&self, id: Uuid, actor: &str) -> Result<Membership> {
        let audit = NewAuditEntry::new(
            "membership",
            id,
            audit_actions::MEMBERSHIP_DEACTIVATED,
            actor,
        );
        self.memberships.deactivate(id, audit).await
    }

    /// Validate the code against this event and redeem it atomically.
    async fn redeem_for_event(&self, event: &Event, code: &str) -> Result<i64> {
        let link = self
            .scholarships
            .find_by_code(code)
            .await?
            .ok_or_else(|| OpsError::ScholarshipInvalid {
                code: code.to_string(),
            })?;

        if link.event_id != event.id {
            return Err(OpsError::ScholarshipInvalid {
                code: code.to_string(),
            });
        }

        let redeemed = self.scholarships.redeem(code).await?;
        Ok(redeemed.override_price_cents)
    }
}
