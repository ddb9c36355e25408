//! Support mailbox: inbound email threading and admin replies
//!
//! Messages from a sender are appended to that sender's most recently active
//! open thread. A sender with no open thread starts a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{parse_from_header, EmailAddress, InboundEmail, MessageDirection, ThreadStatus};

#[derive(Clone)]
pub struct EmailInboundService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailThread {
    pub id: Uuid,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub status: ThreadStatus,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub direction: MessageDirection,
    pub from_email: String,
    pub from_name: Option<String>,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: EmailThread,
    pub messages: Vec<EmailMessage>,
}

/// Webhook acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestResult {
    pub success: bool,
    pub thread_id: Uuid,
    pub message_id: Uuid,
    pub new_thread: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyInput {
    #[validate(length(min = 1, max = 20000, message = "Reply text is required"))]
    pub body_text: String,
    pub body_html: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadStatusInput {
    pub status: ThreadStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreadFilter {
    pub status: Option<ThreadStatus>,
}

const THREAD_SELECT: &str = r#"
    SELECT t.id, t.sender_email, t.sender_name, t.subject, t.status, t.last_message_at, t.created_at,
           (SELECT COUNT(*) FROM email_messages m WHERE m.thread_id = t.id) AS message_count
    FROM email_threads t
"#;

const MESSAGE_COLUMNS: &str = "id, thread_id, direction, from_email, from_name, subject, body_text, \
                               body_html, message_id, created_at";

/// Resolve the sender of an inbound payload
pub fn sender_of(email: &InboundEmail) -> AppResult<EmailAddress> {
    let from = email
        .from
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::validation("from", "Missing sender address"))?;

    parse_from_header(from).ok_or_else(|| AppError::validation("from", "Invalid sender address"))
}

/// Subject for an admin reply: keep the thread subject, prefixed once with `Re:`
pub fn reply_subject(thread_subject: &str) -> String {
    let trimmed = thread_subject.trim();
    if trimmed.get(..3).map_or(false, |p| p.eq_ignore_ascii_case("re:")) {
        trimmed.to_string()
    } else {
        format!("Re: {}", trimmed)
    }
}

impl EmailInboundService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store an inbound email in its thread
    pub async fn ingest(&self, email: InboundEmail) -> AppResult<IngestResult> {
        let sender = sender_of(&email)?;
        let subject = email.subject_or_default();

        let mut tx = self.db.begin().await?;

        // One writer per sender so concurrent mails cannot open two threads
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&sender.email)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM email_threads
            WHERE sender_email = $1 AND status = 'open'
            ORDER BY last_message_at DESC
            LIMIT 1
            "#,
        )
        .bind(&sender.email)
        .fetch_optional(&mut *tx)
        .await?;

        let (thread_id, new_thread) = match existing {
            Some(id) => {
                sqlx::query("UPDATE email_threads SET last_message_at = NOW() WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                (id, false)
            }
            None => {
                let id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO email_threads (sender_email, sender_name, subject)
                    VALUES ($1, $2, $3)
                    RETURNING id
                    "#,
                )
                .bind(&sender.email)
                .bind(&sender.name)
                .bind(&subject)
                .fetch_one(&mut *tx)
                .await?;
                (id, true)
            }
        };

        let message_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO email_messages (thread_id, direction, from_email, from_name, subject,
                                        body_text, body_html, message_id)
            VALUES ($1, 'inbound', $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(thread_id)
        .bind(&sender.email)
        .bind(&sender.name)
        .bind(&subject)
        .bind(&email.text)
        .bind(&email.html)
        .bind(&email.message_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%thread_id, new_thread, sender = %sender.email, "Inbound email stored");

        Ok(IngestResult {
            success: true,
            thread_id,
            message_id,
            new_thread,
        })
    }

    pub async fn list_threads(&self, filter: &ThreadFilter) -> AppResult<Vec<EmailThread>> {
        let threads = sqlx::query_as::<_, EmailThread>(&format!(
            "{} WHERE ($1::thread_status IS NULL OR t.status = $1) ORDER BY t.last_message_at DESC",
            THREAD_SELECT
        ))
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;
        Ok(threads)
    }

    async fn get_thread_row(&self, id: Uuid) -> AppResult<EmailThread> {
        sqlx::query_as::<_, EmailThread>(&format!("{} WHERE t.id = $1", THREAD_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Email thread".to_string()))
    }

    /// A thread with its messages in arrival order
    pub async fn get_thread(&self, id: Uuid) -> AppResult<ThreadDetail> {
        let thread = self.get_thread_row(id).await?;

        let messages = sqlx::query_as::<_, EmailMessage>(&format!(
            "SELECT {} FROM email_messages WHERE thread_id = $1 ORDER BY created_at, id",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(ThreadDetail { thread, messages })
    }

    /// Record an outbound reply written by an admin
    pub async fn reply(&self, actor: &AuthUser, id: Uuid, input: ReplyInput) -> AppResult<EmailMessage> {
        input.validate()?;
        let thread = self.get_thread_row(id).await?;

        if thread.status == ThreadStatus::Closed {
            return Err(AppError::InvalidStateTransition(
                "Reopen the thread before replying".to_string(),
            ));
        }

        let subject = input
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| reply_subject(&thread.subject));

        let mut tx = self.db.begin().await?;

        let message = sqlx::query_as::<_, EmailMessage>(&format!(
            r#"
            INSERT INTO email_messages (thread_id, direction, from_email, from_name, subject, body_text, body_html)
            VALUES ($1, 'outbound', $2, (SELECT full_name FROM profiles WHERE id = $3), $4, $5, $6)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(&actor.email)
        .bind(actor.user_id)
        .bind(&subject)
        .bind(input.body_text.trim())
        .bind(&input.body_html)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE email_threads SET last_message_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Close or reopen a thread
    pub async fn set_status(&self, id: Uuid, status: ThreadStatus) -> AppResult<EmailThread> {
        let updated = sqlx::query("UPDATE email_threads SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.db)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Email thread".to_string()));
        }

        self.get_thread_row(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_of_named_address() {
        let email = InboundEmail {
            from: Some("\"Karim Ahmed\" <Karim@Example.com>".to_string()),
            ..InboundEmail::default()
        };
        let sender = sender_of(&email).unwrap();
        assert_eq!(sender.name, "Karim Ahmed");
        assert_eq!(sender.email, "karim@example.com");
    }

    #[test]
    fn test_sender_of_missing() {
        let err = sender_of(&InboundEmail::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "from"));

        let blank = InboundEmail {
            from: Some("   ".to_string()),
            ..InboundEmail::default()
        };
        assert!(sender_of(&blank).is_err());
    }

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject("Course access"), "Re: Course access");
        assert_eq!(reply_subject("RE: Course access"), "RE: Course access");
        assert_eq!(reply_subject("  re:x "), "re:x");
        assert_eq!(reply_subject("Ünicode"), "Re: Ünicode");
    }
}
