//! Teacher revenue, paid works and withdrawal requests

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{validate_amount, Role, WithdrawalStatus};

/// Finance service
#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevenueRecord {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub course_id: Option<Uuid>,
    pub course_title: Option<String>,
    pub invoice_id: String,
    pub gross_amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Filters for revenue queries
#[derive(Debug, Default, Deserialize)]
pub struct RevenueFilter {
    /// Only honoured for admins
    pub teacher_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Earnings and balance of one teacher, or of everyone for admins
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct RevenueSummary {
    pub sales_count: i64,
    pub gross_total: Decimal,
    pub fee_total: Decimal,
    pub net_total: Decimal,
    pub paid_works_total: Decimal,
    pub withdrawn_total: Decimal,
    pub reserved_total: Decimal,
    #[sqlx(default)]
    pub available_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaidWork {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub title: String,
    pub amount: Decimal,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaidWorkInput {
    pub teacher_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub amount: Decimal,
    pub note: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub amount: Decimal,
    pub method: String,
    pub account_details: String,
    pub status: WithdrawalStatus,
    pub admin_note: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWithdrawalInput {
    pub amount: Decimal,
    #[validate(length(min = 1, max = 50, message = "Payout method is required"))]
    pub method: String,
    #[validate(length(min = 1, max = 500, message = "Account details are required"))]
    pub account_details: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWithdrawalStatusInput {
    pub status: WithdrawalStatus,
    pub admin_note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawalFilter {
    pub status: Option<WithdrawalStatus>,
}

/// Spendable balance: net revenue minus every withdrawal that is not rejected
pub fn available_balance(net_total: Decimal, reserved_total: Decimal, withdrawn_total: Decimal) -> Decimal {
    net_total - reserved_total - withdrawn_total
}

/// Serialize rows as CSV with a header line
pub fn to_csv<T: Serialize>(rows: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

/// Teacher scope of a finance query: admins may pick one or see everyone
fn scope(actor: &AuthUser, requested: Option<Uuid>) -> AppResult<Option<Uuid>> {
    match actor.role {
        Role::Admin => Ok(requested),
        Role::Teacher => Ok(Some(actor.user_id)),
        Role::Student => Err(AppError::Forbidden(
            "Admin or teacher access required".to_string(),
        )),
    }
}

const REVENUE_SELECT: &str = r#"
    SELECT r.id, r.teacher_id, p.full_name AS teacher_name, r.course_id, c.title AS course_title,
           r.invoice_id, r.gross_amount, r.fee, r.net_amount, r.created_at
    FROM revenue_records r
    LEFT JOIN profiles p ON p.id = r.teacher_id
    LEFT JOIN courses c ON c.id = r.course_id
"#;

const WITHDRAWAL_SELECT: &str = r#"
    SELECT w.id, w.teacher_id, p.full_name AS teacher_name, w.amount, w.method, w.account_details,
           w.status, w.admin_note, w.processed_at, w.created_at, w.updated_at
    FROM withdrawal_requests w
    LEFT JOIN profiles p ON p.id = w.teacher_id
"#;

const SUMMARY_QUERY: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM revenue_records WHERE $1::uuid IS NULL OR teacher_id = $1) AS sales_count,
        (SELECT COALESCE(SUM(gross_amount), 0) FROM revenue_records WHERE $1::uuid IS NULL OR teacher_id = $1) AS gross_total,
        (SELECT COALESCE(SUM(fee), 0) FROM revenue_records WHERE $1::uuid IS NULL OR teacher_id = $1) AS fee_total,
        (SELECT COALESCE(SUM(net_amount), 0) FROM revenue_records WHERE $1::uuid IS NULL OR teacher_id = $1) AS net_total,
        (SELECT COALESCE(SUM(amount), 0) FROM paid_works WHERE $1::uuid IS NULL OR teacher_id = $1) AS paid_works_total,
        (SELECT COALESCE(SUM(amount), 0) FROM withdrawal_requests
          WHERE ($1::uuid IS NULL OR teacher_id = $1) AND status = 'paid') AS withdrawn_total,
        (SELECT COALESCE(SUM(amount), 0) FROM withdrawal_requests
          WHERE ($1::uuid IS NULL OR teacher_id = $1) AND status IN ('pending', 'approved')) AS reserved_total
"#;

impl FinanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Revenue
    // ------------------------------------------------------------------------

    pub async fn list_revenue(&self, actor: &AuthUser, filter: &RevenueFilter) -> AppResult<Vec<RevenueRecord>> {
        let teacher_id = scope(actor, filter.teacher_id)?;

        let rows = sqlx::query_as::<_, RevenueRecord>(&format!(
            r#"
            {}
            WHERE ($1::uuid IS NULL OR r.teacher_id = $1)
              AND ($2::date IS NULL OR r.created_at::date >= $2)
              AND ($3::date IS NULL OR r.created_at::date <= $3)
            ORDER BY r.created_at DESC
            "#,
            REVENUE_SELECT
        ))
        .bind(teacher_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn revenue_summary(&self, actor: &AuthUser, teacher_id: Option<Uuid>) -> AppResult<RevenueSummary> {
        let teacher_id = scope(actor, teacher_id)?;

        let mut summary = sqlx::query_as::<_, RevenueSummary>(SUMMARY_QUERY)
            .bind(teacher_id)
            .fetch_one(&self.db)
            .await?;

        summary.available_balance =
            available_balance(summary.net_total, summary.reserved_total, summary.withdrawn_total);
        Ok(summary)
    }

    /// Revenue rows rendered as CSV
    pub async fn export_revenue_csv(&self, actor: &AuthUser, filter: &RevenueFilter) -> AppResult<String> {
        let rows = self.list_revenue(actor, filter).await?;
        to_csv(&rows)
    }

    // ------------------------------------------------------------------------
    // Paid works
    // ------------------------------------------------------------------------

    pub async fn create_paid_work(&self, input: CreatePaidWorkInput) -> AppResult<PaidWork> {
        input.validate()?;
        validate_amount(input.amount).map_err(|msg| AppError::validation("amount", msg))?;

        let teacher_role =
            sqlx::query_scalar::<_, Role>("SELECT role FROM profiles WHERE id = $1")
                .bind(input.teacher_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Teacher".to_string()))?;
        if teacher_role != Role::Teacher {
            return Err(AppError::validation("teacher_id", "Profile is not a teacher"));
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO paid_works (teacher_id, title, amount, note, paid_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            RETURNING id
            "#,
        )
        .bind(input.teacher_id)
        .bind(input.title.trim())
        .bind(input.amount)
        .bind(&input.note)
        .bind(input.paid_at)
        .fetch_one(&self.db)
        .await?;

        self.get_paid_work(id).await
    }

    async fn get_paid_work(&self, id: Uuid) -> AppResult<PaidWork> {
        sqlx::query_as::<_, PaidWork>(
            r#"
            SELECT w.id, w.teacher_id, p.full_name AS teacher_name, w.title, w.amount, w.note,
                   w.paid_at, w.created_at
            FROM paid_works w
            LEFT JOIN profiles p ON p.id = w.teacher_id
            WHERE w.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Paid work".to_string()))
    }

    pub async fn list_paid_works(&self, actor: &AuthUser) -> AppResult<Vec<PaidWork>> {
        let teacher_id = scope(actor, None)?;

        let rows = sqlx::query_as::<_, PaidWork>(
            r#"
            SELECT w.id, w.teacher_id, p.full_name AS teacher_name, w.title, w.amount, w.note,
                   w.paid_at, w.created_at
            FROM paid_works w
            LEFT JOIN profiles p ON p.id = w.teacher_id
            WHERE $1::uuid IS NULL OR w.teacher_id = $1
            ORDER BY w.paid_at DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    // ------------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------------

    /// Request a payout; the amount must fit the teacher's available balance
    pub async fn request_withdrawal(
        &self,
        actor: &AuthUser,
        input: CreateWithdrawalInput,
    ) -> AppResult<WithdrawalRequest> {
        if actor.role != Role::Teacher {
            return Err(AppError::Forbidden(
                "Only teachers can request withdrawals".to_string(),
            ));
        }
        input.validate()?;
        validate_amount(input.amount).map_err(|msg| AppError::validation("amount", msg))?;

        let mut tx = self.db.begin().await?;

        // Serializes concurrent requests of the same teacher
        sqlx::query("SELECT id FROM profiles WHERE id = $1 FOR UPDATE")
            .bind(actor.user_id)
            .execute(&mut *tx)
            .await?;

        let balance = Self::balance_in(&mut tx, actor.user_id).await?;
        if input.amount > balance {
            return Err(AppError::InsufficientBalance(format!(
                "Requested {} but only {} is available",
                input.amount, balance
            )));
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO withdrawal_requests (teacher_id, amount, method, account_details)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(actor.user_id)
        .bind(input.amount)
        .bind(input.method.trim())
        .bind(input.account_details.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(withdrawal_id = %id, teacher_id = %actor.user_id, amount = %input.amount, "Withdrawal requested");
        self.get_withdrawal(id).await
    }

    async fn balance_in(tx: &mut Transaction<'_, Postgres>, teacher_id: Uuid) -> AppResult<Decimal> {
        let summary = sqlx::query_as::<_, RevenueSummary>(SUMMARY_QUERY)
            .bind(Some(teacher_id))
            .fetch_one(&mut **tx)
            .await?;
        Ok(available_balance(
            summary.net_total,
            summary.reserved_total,
            summary.withdrawn_total,
        ))
    }

    pub async fn get_withdrawal(&self, id: Uuid) -> AppResult<WithdrawalRequest> {
        sqlx::query_as::<_, WithdrawalRequest>(&format!("{} WHERE w.id = $1", WITHDRAWAL_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Withdrawal request".to_string()))
    }

    pub async fn list_withdrawals(
        &self,
        actor: &AuthUser,
        filter: &WithdrawalFilter,
    ) -> AppResult<Vec<WithdrawalRequest>> {
        let teacher_id = scope(actor, None)?;

        let rows = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            {}
            WHERE ($1::uuid IS NULL OR w.teacher_id = $1)
              AND ($2::withdrawal_status IS NULL OR w.status = $2)
            ORDER BY w.created_at DESC
            "#,
            WITHDRAWAL_SELECT
        ))
        .bind(teacher_id)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Move a withdrawal request along its lifecycle (admin)
    pub async fn set_withdrawal_status(
        &self,
        id: Uuid,
        input: UpdateWithdrawalStatusInput,
    ) -> AppResult<WithdrawalRequest> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, WithdrawalStatus>(
            "SELECT status FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Withdrawal request".to_string()))?;

        if !current.can_transition_to(input.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot change withdrawal from {} to {}",
                current, input.status
            )));
        }

        sqlx::query(
            r#"
            UPDATE withdrawal_requests
            SET status = $2,
                admin_note = COALESCE($3, admin_note),
                processed_at = CASE WHEN $4 THEN NOW() ELSE processed_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.status)
        .bind(&input.admin_note)
        .bind(input.status.is_terminal())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(withdrawal_id = %id, from = %current, to = %input.status, "Withdrawal status changed");
        self.get_withdrawal(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "t@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_scope() {
        let requested = Some(Uuid::new_v4());
        assert_eq!(scope(&actor(Role::Admin), requested).unwrap(), requested);
        assert_eq!(scope(&actor(Role::Admin), None).unwrap(), None);

        let teacher = actor(Role::Teacher);
        assert_eq!(scope(&teacher, requested).unwrap(), Some(teacher.user_id));
        assert!(scope(&actor(Role::Student), None).is_err());
    }

    #[test]
    fn test_available_balance() {
        let balance = available_balance(Decimal::new(1000, 0), Decimal::new(300, 0), Decimal::new(200, 0));
        assert_eq!(balance, Decimal::new(500, 0));
    }

    #[derive(Serialize)]
    struct Row {
        invoice_id: &'static str,
        net_amount: Decimal,
    }

    #[test]
    fn test_to_csv() {
        let csv = to_csv(&[
            Row { invoice_id: "INV1", net_amount: Decimal::new(97500, 2) },
            Row { invoice_id: "INV2", net_amount: Decimal::new(1000, 2) },
        ])
        .unwrap();
        assert_eq!(csv, "invoice_id,net_amount\nINV1,975.00\nINV2,10.00\n");
    }

    #[test]
    fn test_to_csv_empty() {
        assert_eq!(to_csv::<Row>(&[]).unwrap(), "");
    }
}
