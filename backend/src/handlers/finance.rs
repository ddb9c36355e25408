//! Teacher revenue, paid works and withdrawal handlers

use axum::{extract::State, http::{header, StatusCode}, response::IntoResponse, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::services::finance::{
    CreatePaidWorkInput, CreateWithdrawalInput, FinanceService, PaidWork, RevenueFilter,
    RevenueRecord, RevenueSummary, UpdateWithdrawalStatusInput, WithdrawalFilter,
    WithdrawalRequest,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub teacher_id: Option<Uuid>,
}

/// GET /revenue (admin all, teacher own)
pub async fn list_revenue(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<RevenueFilter>,
) -> AppResult<Json<Vec<RevenueRecord>>> {
    let rows = FinanceService::new(state.db)
        .list_revenue(&user, &filter)
        .await?;
    Ok(Json(rows))
}

pub async fn revenue_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<RevenueSummary>> {
    let summary = FinanceService::new(state.db)
        .revenue_summary(&user, query.teacher_id)
        .await?;
    Ok(Json(summary))
}

/// GET /revenue/export: the revenue list as a CSV attachment
pub async fn export_revenue(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<RevenueFilter>,
) -> AppResult<impl IntoResponse> {
    let csv = FinanceService::new(state.db)
        .export_revenue_csv(&user, &filter)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"revenue.csv\""),
        ],
        csv,
    ))
}

/// Record a work paid outside the platform (admin)
pub async fn create_paid_work(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreatePaidWorkInput>,
) -> AppResult<(StatusCode, Json<PaidWork>)> {
    user.require_admin()?;
    let work = FinanceService::new(state.db).create_paid_work(input).await?;
    state
        .changes
        .publish(Table::PaidWorks, ChangeAction::Insert, work.id);
    Ok((StatusCode::CREATED, Json(work)))
}

pub async fn list_paid_works(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<PaidWork>>> {
    let works = FinanceService::new(state.db).list_paid_works(&user).await?;
    Ok(Json(works))
}

/// Teacher payout request
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateWithdrawalInput>,
) -> AppResult<(StatusCode, Json<WithdrawalRequest>)> {
    let request = FinanceService::new(state.db)
        .request_withdrawal(&user, input)
        .await?;
    state
        .changes
        .publish(Table::WithdrawalRequests, ChangeAction::Insert, request.id);
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<WithdrawalFilter>,
) -> AppResult<Json<Vec<WithdrawalRequest>>> {
    let rows = FinanceService::new(state.db)
        .list_withdrawals(&user, &filter)
        .await?;
    Ok(Json(rows))
}

/// Approve, reject or mark paid (admin)
pub async fn set_withdrawal_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(withdrawal_id): Path<Uuid>,
    Json(input): Json<UpdateWithdrawalStatusInput>,
) -> AppResult<Json<WithdrawalRequest>> {
    user.require_admin()?;
    let request = FinanceService::new(state.db)
        .set_withdrawal_status(withdrawal_id, input)
        .await?;
    state
        .changes
        .publish(Table::WithdrawalRequests, ChangeAction::Update, request.id);
    Ok(Json(request))
}
