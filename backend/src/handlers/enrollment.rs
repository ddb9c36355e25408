//! Enrollment handlers

use axum::{extract::State, http::StatusCode, Extension};

use crate::error::AppResult;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::services::enrollment::{EnrolledCourse, Enrollment, EnrollmentService, ManualEnrollmentInput};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

/// Courses the caller is enrolled in
pub async fn my_courses(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<EnrolledCourse>>> {
    let courses = EnrollmentService::new(state.db)
        .my_courses(user.user_id)
        .await?;
    Ok(Json(courses))
}

/// Enroll a student by hand (admin); 201 when new, 200 when already enrolled
pub async fn enroll_manual(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ManualEnrollmentInput>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
    user.require_admin()?;
    let (enrollment, created) = EnrollmentService::new(state.db)
        .enroll_manual(input)
        .await?;

    if created {
        state.changes.publish(
            Table::Enrollments,
            ChangeAction::Insert,
            format!("{}:{}", enrollment.student_id, enrollment.course_id),
        );
        Ok((StatusCode::CREATED, Json(enrollment)))
    } else {
        Ok((StatusCode::OK, Json(enrollment)))
    }
}
