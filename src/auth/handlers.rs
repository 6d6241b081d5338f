use std::collections::BTreeMap;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::auth::dto::{LoginRequest, RegisterRequest};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::auth::repo::Role;
use crate::auth::services::{self, is_valid_email};
use crate::error::ApiError;
use crate::extract::Json;
use crate::response::{self, ApiResponse};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
}

fn validate_register(payload: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    if payload.email.is_empty() {
        errors.insert("email".to_string(), "Email is required".to_string());
    } else if !is_valid_email(&payload.email) {
        errors.insert(
            "email".to_string(),
            "Please provide a valid email address".to_string(),
        );
    }

    if payload.password.is_empty() {
        errors.insert("password".to_string(), "Password is required".to_string());
    } else if payload.password.chars().count() < 6 {
        errors.insert(
            "password".to_string(),
            "Password must be at least 6 characters long".to_string(),
        );
    }

    // Length rules count characters, not bytes.
    if let Some(name) = &payload.name {
        if name.chars().count() < 2 {
            errors.insert(
                "name".to_string(),
                "Name must be at least 2 characters long".to_string(),
            );
        } else if name.chars().count() > 255 {
            errors.insert(
                "name".to_string(),
                "Name cannot exceed 255 characters".to_string(),
            );
        }
    }

    if let Some(role) = &payload.role {
        if Role::parse(role).is_none() {
            errors.insert(
                "role".to_string(),
                "Role must be one of student, instructor, admin".to_string(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn validate_login(payload: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    if payload.email.is_empty() {
        errors.insert("email".to_string(), "Email is required".to_string());
    } else if !is_valid_email(&payload.email) {
        errors.insert(
            "email".to_string(),
            "Please provide a valid email address".to_string(),
        );
    }

    if payload.password.is_empty() {
        errors.insert("password".to_string(), "Password is required".to_string());
    } else if payload.password.chars().count() < 6 {
        errors.insert(
            "password".to_string(),
            "Password must be at least 6 characters long".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    validate_register(&payload)?;
    let keys = JwtKeys::from_ref(&state);
    let result = services::register(&state.db, &keys, payload).await?;
    Ok(response::created(result, "User registered successfully"))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    validate_login(&payload)?;
    let keys = JwtKeys::from_ref(&state);
    let result = services::login(&state.db, &keys, payload).await?;
    Ok(response::ok(result, "Login successful"))
}

#[instrument(skip(state))]
async fn profile(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let user = services::get_user_by_id(&state.db, current.id).await?;
    Ok(response::ok(user, "Profile retrieved successfully"))
}
