//! Hosted checkout functions

use axum::{body::Bytes, extract::State, Json};

use crate::error::{AppError, AppResult};
use crate::handlers::parse_json_body;
use crate::models::{CheckoutRequest, CheckoutResponse, VerifyPaymentRequest};
use crate::services::payment::{build_checkout_request, PaymentService, VerifyPaymentResponse};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

/// POST /functions/v1/uddoktapay-checkout
pub async fn checkout(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CheckoutResponse>> {
    let request: CheckoutRequest = parse_json_body(&body)?;
    let gateway_request =
        build_checkout_request(&request, state.config.payment.webhook_url.as_deref())?;

    let service = PaymentService::new(state.db.clone(), state.http.clone(), &state.config.payment)?;
    let response = service.checkout(gateway_request).await?;

    state
        .changes
        .publish(Table::Payments, ChangeAction::Insert, &response.invoice_id);
    Ok(Json(response))
}

/// POST /functions/v1/uddoktapay-verify
pub async fn verify(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<VerifyPaymentResponse>> {
    let request: VerifyPaymentRequest = parse_json_body(&body)?;
    let invoice_id = request
        .invoice_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing invoice_id".to_string()))?
        .to_string();

    let service = PaymentService::new(state.db.clone(), state.http.clone(), &state.config.payment)?;
    let outcome = service.verify(&invoice_id).await?;

    if let Some(done) = &outcome.bookkeeping {
        if let Some(payment_id) = done.payment_id {
            state
                .changes
                .publish(Table::Payments, ChangeAction::Update, payment_id);
        }
        if let Some((student_id, course_id)) = done.enrollment {
            state.changes.publish(
                Table::Enrollments,
                ChangeAction::Insert,
                format!("{}:{}", student_id, course_id),
            );
        }
        if let Some(record_id) = done.revenue_record {
            state
                .changes
                .publish(Table::RevenueRecords, ChangeAction::Insert, record_id);
        }
    }

    Ok(Json(outcome.response))
}
