//! Certificate handlers: the public verification function and issuance

use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};

use crate::error::AppResult;
use crate::handlers::parse_json_body;
use crate::middleware::AuthUser;
use crate::models::{CertificateVerification, VerifyCertificateRequest};
use crate::services::certificate::{
    parse_certificate_id, Certificate, CertificateService, IssueCertificateInput,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

/// POST /functions/v1/verify-certificate
///
/// Public. The response never identifies the student.
pub async fn verify_certificate(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CertificateVerification>> {
    let request: VerifyCertificateRequest = parse_json_body(&body)?;
    let certificate_id = parse_certificate_id(request.certificate_id.as_ref())?;

    let verification = CertificateService::new(state.db)
        .verify_public(&certificate_id)
        .await?;

    tracing::info!(%certificate_id, "Certificate verified");
    Ok(Json(verification))
}

/// Issue a certificate (admin)
pub async fn issue_certificate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<IssueCertificateInput>,
) -> AppResult<(StatusCode, Json<Certificate>)> {
    user.require_admin()?;
    let certificate = CertificateService::new(state.db)
        .issue(user.user_id, input)
        .await?;
    state
        .changes
        .publish(Table::Certificates, ChangeAction::Insert, certificate.id);
    Ok((StatusCode::CREATED, Json(certificate)))
}

/// All certificates (admin)
pub async fn list_certificates(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Certificate>>> {
    user.require_admin()?;
    let certificates = CertificateService::new(state.db).list_all().await?;
    Ok(Json(certificates))
}

pub async fn my_certificates(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Certificate>>> {
    let certificates = CertificateService::new(state.db)
        .list_for_student(user.user_id)
        .await?;
    Ok(Json(certificates))
}
