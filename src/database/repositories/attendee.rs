//! Postgres attendee repository

use chrono::Utc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::AttendeeRepository;
use crate::models::{Attendee, CreateAttendeeRequest};
use crate::utils::errors::{OpsError, Result};

const COLUMNS: &str = "id, email, first_name, last_name, phone, created_at, updated_at";

#[derive(Clone)]
pub struct PgAttendeeRepository {
    pool: DatabasePool,
}

impl PgAttendeeRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendeeRepository for PgAttendeeRepository {
    async fn create(&self, request: CreateAttendeeRequest) -> Result<Attendee> {
        let now = Utc::now();
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            r#"
            INSERT INTO attendees (id, email, first_name, last_name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.email)
        .bind(request.first_name)
        .bind(request.last_name)
        .bind(request.phone)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(attendee)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendee>> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {COLUMNS} FROM attendees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attendee)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Attendee>> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {COLUMNS} FROM attendees WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attendee)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
        phone: Option<String>,
    ) -> Result<Attendee> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            r#"
            UPDATE attendees
            SET first_name = $2, last_name = $3, phone = $4, updated_at = $5
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        attendee.ok_or(OpsError::AttendeeNotFound { attendee_id: id })
    }
}
