//! Postgres event repository

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::EventRepository;
use crate::models::{CreateEventRequest, Event, EventStatus, UpdateEventRequest};
use crate::utils::errors::{OpsError, Result};

const COLUMNS: &str = "id, name, slug, description, event_date, pricing_model, \
    fixed_price_cents, min_donation_cents, capacity, reminder_delay_minutes, \
    auto_expire_hours, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgEventRepository {
    pool: DatabasePool,
}

impl PgEventRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, name, slug, description, event_date, pricing_model,
                fixed_price_cents, min_donation_cents, capacity, reminder_delay_minutes,
                auto_expire_hours, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.name)
        .bind(request.slug)
        .bind(request.description)
        .bind(request.event_date)
        .bind(request.pricing_model)
        .bind(request.fixed_price_cents)
        .bind(request.min_donation_cents)
        .bind(request.capacity)
        .bind(request.reminder_delay_minutes)
        .bind(request.auto_expire_hours)
        .bind(EventStatus::Draft)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Event>(&format!(
            "SELECT {COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OpsError::EventNotFound { event_id: id })?;

        let name = request.name.unwrap_or(current.name);
        let description = request.description.unwrap_or(current.description);
        let event_date = request.event_date.unwrap_or(current.event_date);
        let fixed_price_cents = request.fixed_price_cents.unwrap_or(current.fixed_price_cents);
        let min_donation_cents = request
            .min_donation_cents
            .unwrap_or(current.min_donation_cents);
        let capacity = request.capacity.unwrap_or(current.capacity);
        let reminder_delay_minutes = request
            .reminder_delay_minutes
            .unwrap_or(current.reminder_delay_minutes);
        let auto_expire_hours = request.auto_expire_hours.unwrap_or(current.auto_expire_hours);
        let status = request.status.unwrap_or(current.status);

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET name = $2,
                description = $3,
                event_date = $4,
                fixed_price_cents = $5,
                min_donation_cents = $6,
                capacity = $7,
                reminder_delay_minutes = $8,
                auto_expire_hours = $9,
                status = $10,
                updated_at = $11
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(event_date)
        .bind(fixed_price_cents)
        .bind(min_donation_cents)
        .bind(capacity)
        .bind(reminder_delay_minutes)
        .bind(auto_expire_hours)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn list_by_status(&self, status: EventStatus) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {COLUMNS} FROM events WHERE status = $1 ORDER BY event_date ASC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
