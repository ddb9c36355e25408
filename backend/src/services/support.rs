//! Support ticket service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::TicketStatus;

#[derive(Clone)]
pub struct SupportService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub admin_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketInput {
    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketInput {
    pub status: Option<TicketStatus>,
    pub admin_reply: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
}

const TICKET_SELECT: &str = r#"
    SELECT t.id, t.user_id, p.full_name AS user_name, p.email AS user_email, t.subject, t.message,
           t.status, t.admin_reply, t.created_at, t.updated_at
    FROM support_tickets t
    LEFT JOIN profiles p ON p.id = t.user_id
"#;

impl SupportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a ticket for the caller
    pub async fn create(&self, user_id: Uuid, input: CreateTicketInput) -> AppResult<SupportTicket> {
        input.validate()?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO support_tickets (user_id, subject, message) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(input.subject.trim())
        .bind(input.message.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(ticket_id = %id, %user_id, "Support ticket opened");
        self.get(id).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<SupportTicket> {
        sqlx::query_as::<_, SupportTicket>(&format!("{} WHERE t.id = $1", TICKET_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket".to_string()))
    }

    /// Own tickets; admins see every ticket
    pub async fn list(&self, actor: &AuthUser, filter: &TicketFilter) -> AppResult<Vec<SupportTicket>> {
        let owner = if actor.is_admin() { None } else { Some(actor.user_id) };

        let tickets = sqlx::query_as::<_, SupportTicket>(&format!(
            r#"
            {}
            WHERE ($1::uuid IS NULL OR t.user_id = $1)
              AND ($2::ticket_status IS NULL OR t.status = $2)
            ORDER BY t.updated_at DESC
            "#,
            TICKET_SELECT
        ))
        .bind(owner)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(tickets)
    }

    /// Change status and/or reply to a ticket (admin)
    pub async fn update(&self, id: Uuid, input: UpdateTicketInput) -> AppResult<SupportTicket> {
        if input.status.is_none() && input.admin_reply.is_none() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, TicketStatus>(
            "SELECT status FROM support_tickets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket".to_string()))?;

        if let Some(next) = input.status {
            if next != current && !current.can_transition_to(next) {
                return Err(AppError::InvalidStateTransition(format!(
                    "Cannot change ticket from {} to {}",
                    current, next
                )));
            }
        }
        if current == TicketStatus::Closed && input.admin_reply.is_some() {
            return Err(AppError::InvalidStateTransition(
                "Cannot reply to a closed ticket".to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE support_tickets
            SET status = COALESCE($2, status),
                admin_reply = COALESCE($3, admin_reply),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.status)
        .bind(input.admin_reply.as_deref().map(str::trim))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_validation() {
        let input = CreateTicketInput {
            subject: String::new(),
            message: "Video 3 does not load".to_string(),
        };
        let err: AppError = input.validate().unwrap_err().into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "subject"));
    }
}
