use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::{AdminUser, AuthUser};
use crate::auth::services::is_valid_email;
use crate::enrollments::dto::EnrollmentRequest;
use crate::enrollments::services;
use crate::error::ApiError;
use crate::extract::Json;
use crate::response::{self, ApiResponse};
use crate::state::AppState;

pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/enrollments", post(create_enrollment).delete(unenroll_student))
        .route("/enrollments/student/:email", get(student_enrollments))
        .route("/enrollments/stats/overview", get(enrollment_stats))
        .route("/enrollments/:id", get(get_enrollment))
}

fn validate_request(payload: &EnrollmentRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    if payload.student_email.is_empty() {
        errors.insert(
            "studentEmail".to_string(),
            "Student email is required".to_string(),
        );
    } else if !is_valid_email(&payload.student_email) {
        errors.insert(
            "studentEmail".to_string(),
            "Please provide a valid email address".to_string(),
        );
    }

    if payload.course_id.is_empty() {
        errors.insert("courseId".to_string(), "Course ID is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn parse_course_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Course not found".to_string()))
}

#[instrument(skip(state, payload))]
async fn create_enrollment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(payload): Json<EnrollmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    validate_request(&payload)?;
    let course_id = parse_course_id(&payload.course_id)?;
    let enrollment =
        services::create_enrollment(&state.db, &payload.student_email, course_id).await?;
    Ok(response::created(
        enrollment,
        "Enrollment created successfully",
    ))
}

#[instrument(skip(state))]
async fn student_enrollments(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(email): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    let enrollments = services::get_student_enrollments(&state.db, &email).await?;
    Ok(response::ok(
        enrollments,
        &format!("Enrollments for {email} retrieved successfully"),
    ))
}

#[instrument(skip(state))]
async fn get_enrollment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::NotFound("Enrollment not found".to_string()))?;
    let enrollment = services::get_enrollment_by_id(&state.db, id).await?;
    Ok(response::ok(enrollment, "Enrollment retrieved successfully"))
}

#[instrument(skip(state, payload))]
async fn unenroll_student(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(payload): Json<EnrollmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    validate_request(&payload)?;
    let course_id = parse_course_id(&payload.course_id)?;
    let enrollment =
        services::unenroll_student(&state.db, &payload.student_email, course_id).await?;
    Ok(response::ok(enrollment, "Student unenrolled successfully"))
}

#[instrument(skip(state))]
async fn enrollment_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let stats = services::get_enrollment_stats(&state.db).await?;
    Ok(response::ok(
        stats,
        "Enrollment statistics retrieved successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_valid_pair() {
        let payload = EnrollmentRequest {
            student_email: "student1@example.com".into(),
            course_id: Uuid::new_v4().to_string(),
        };
        assert!(validate_request(&payload).is_ok());
    }

    #[test]
    fn request_rejects_missing_fields() {
        let payload = EnrollmentRequest {
            student_email: String::new(),
            course_id: String::new(),
        };
        let ApiError::Validation(errors) = validate_request(&payload).unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors["studentEmail"], "Student email is required");
        assert_eq!(errors["courseId"], "Course ID is required");
    }

    #[test]
    fn request_rejects_malformed_email() {
        let payload = EnrollmentRequest {
            student_email: "not-an-email".into(),
            course_id: Uuid::new_v4().to_string(),
        };
        assert!(validate_request(&payload).is_err());
    }

    #[test]
    fn unparseable_course_id_reads_as_not_found() {
        let err = parse_course_id("abc123").unwrap_err();
        let response = axum::response::IntoResponse::into_response(err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
