use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::{AdminUser, OptionalUser};
use crate::auth::repo::Role;
use crate::courses::dto::{CourseListQuery, CreateCourseRequest, SearchQuery};
use crate::courses::repo::{CourseFilters, Difficulty};
use crate::courses::services;
use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::response::{self, ApiResponse};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/search", get(search_courses))
        .route("/courses/:id", get(get_course).delete(delete_course))
}

fn validate_create(payload: &CreateCourseRequest) -> Result<Option<Difficulty>, ApiError> {
    let mut errors = BTreeMap::new();

    // Length rules count characters, not bytes.
    if payload.title.is_empty() {
        errors.insert("title".to_string(), "Title is required".to_string());
    } else if payload.title.chars().count() < 3 {
        errors.insert(
            "title".to_string(),
            "Title must be at least 3 characters long".to_string(),
        );
    } else if payload.title.chars().count() > 255 {
        errors.insert(
            "title".to_string(),
            "Title cannot exceed 255 characters".to_string(),
        );
    }

    if payload.description.is_empty() {
        errors.insert(
            "description".to_string(),
            "Description is required".to_string(),
        );
    } else if payload.description.chars().count() < 10 {
        errors.insert(
            "description".to_string(),
            "Description must be at least 10 characters long".to_string(),
        );
    }

    let mut difficulty = None;
    if let Some(raw) = &payload.difficulty {
        match Difficulty::parse(raw) {
            Some(d) => difficulty = Some(d),
            None => {
                errors.insert(
                    "difficulty".to_string(),
                    "Difficulty must be one of Beginner, Intermediate, Advanced".to_string(),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(difficulty)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn parse_list_query(query: &CourseListQuery) -> Result<CourseFilters, ApiError> {
    let mut errors = BTreeMap::new();

    let mut difficulty = None;
    if let Some(raw) = &query.difficulty {
        match Difficulty::parse(raw) {
            Some(d) => difficulty = Some(d),
            None => {
                errors.insert(
                    "difficulty".to_string(),
                    "Difficulty must be one of Beginner, Intermediate, Advanced".to_string(),
                );
            }
        }
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=100).contains(&limit) {
        errors.insert(
            "limit".to_string(),
            "Limit must be between 1 and 100".to_string(),
        );
    }

    let mut cursor = None;
    if let Some(raw) = &query.cursor {
        match Uuid::parse_str(raw) {
            Ok(id) => cursor = Some(id),
            Err(_) => {
                errors.insert(
                    "cursor".to_string(),
                    "Cursor must be a valid course id".to_string(),
                );
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(CourseFilters {
        difficulty,
        is_active: query.is_active,
        search: query.search.clone(),
        cursor,
        limit,
    })
}

fn parse_course_id(raw: &str) -> Result<Uuid, ApiError> {
    // An unparseable id cannot match any record, so it reads as absent.
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Course not found".to_string()))
}

#[instrument(skip(state, payload))]
async fn create_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let difficulty = validate_create(&payload)?;
    let course =
        services::create_course(&state.db, &payload.title, &payload.description, difficulty)
            .await?;
    Ok(response::created(course, "Course created successfully"))
}

/// With no query parameters this returns the plain active listing; with any,
/// the filtered page. Anonymous and student callers only ever see active
/// courses regardless of the `isActive` filter they send.
#[instrument(skip(state, user))]
async fn list_courses(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<CourseListQuery>,
) -> Result<Response, ApiError> {
    if query.is_empty() {
        let courses = services::list_all_active(&state.db).await?;
        return Ok(response::ok(courses, "Courses retrieved successfully").into_response());
    }

    let mut filters = parse_list_query(&query)?;
    let privileged = matches!(
        user.as_ref().map(|u| u.role),
        Some(Role::Admin) | Some(Role::Instructor)
    );
    if !privileged {
        filters.is_active = Some(true);
    }

    let page = services::list_courses(&state.db, &filters).await?;
    Ok(response::ok(page, "Courses retrieved successfully").into_response())
}

#[instrument(skip(state))]
async fn search_courses(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let q = match query.q.as_deref() {
        Some(q) if !q.is_empty() => q,
        _ => return Err(ApiError::BadRequest("Search query is required".to_string())),
    };

    let difficulty = match &query.difficulty {
        Some(raw) => Some(Difficulty::parse(raw).ok_or_else(|| {
            ApiError::validation(
                "difficulty",
                "Difficulty must be one of Beginner, Intermediate, Advanced",
            )
        })?),
        None => None,
    };

    let courses = services::search_courses(&state.db, q, difficulty).await?;
    Ok(response::ok(
        courses,
        "Search results retrieved successfully",
    ))
}

#[instrument(skip(state))]
async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let id = parse_course_id(&id)?;
    let course = services::get_course_by_id(&state.db, id).await?;
    Ok(response::ok(course, "Course retrieved successfully"))
}

#[instrument(skip(state))]
async fn delete_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<impl serde::Serialize>>), ApiError> {
    let id = parse_course_id(&id)?;
    let course = services::delete_course(&state.db, id).await?;
    Ok(response::ok(course, "Course deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_payload() -> CreateCourseRequest {
        CreateCourseRequest {
            title: "Rust for Backend Engineers".into(),
            description: "Ownership, borrowing, and async services.".into(),
            difficulty: Some("Intermediate".into()),
        }
    }

    #[test]
    fn create_accepts_valid_payload() {
        let difficulty = validate_create(&create_payload()).unwrap();
        assert_eq!(difficulty, Some(Difficulty::Intermediate));
    }

    #[test]
    fn create_difficulty_is_optional() {
        let payload = CreateCourseRequest {
            difficulty: None,
            ..create_payload()
        };
        assert_eq!(validate_create(&payload).unwrap(), None);
    }

    #[test]
    fn create_rejects_short_title_and_description() {
        let payload = CreateCourseRequest {
            title: "ab".into(),
            description: "too short".into(),
            difficulty: None,
        };
        let ApiError::Validation(errors) = validate_create(&payload).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("description"));
    }

    #[test]
    fn title_cap_counts_characters_not_bytes() {
        // 200 three-byte characters: 600 bytes, well under the 255-char cap.
        let payload = CreateCourseRequest {
            title: "語".repeat(200),
            ..create_payload()
        };
        assert!(validate_create(&payload).is_ok());

        let payload = CreateCourseRequest {
            title: "語".repeat(256),
            ..create_payload()
        };
        let ApiError::Validation(errors) = validate_create(&payload).unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors["title"], "Title cannot exceed 255 characters");
    }

    #[test]
    fn description_minimum_counts_characters_not_bytes() {
        // 6 characters but 18 bytes: still below the 10-character minimum.
        let payload = CreateCourseRequest {
            description: "初級講座入門".into(),
            ..create_payload()
        };
        let ApiError::Validation(errors) = validate_create(&payload).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("description"));
    }

    #[test]
    fn create_rejects_unknown_difficulty() {
        let payload = CreateCourseRequest {
            difficulty: Some("Expert".into()),
            ..create_payload()
        };
        assert!(validate_create(&payload).is_err());
    }

    #[test]
    fn list_query_defaults_limit_to_ten() {
        let filters = parse_list_query(&CourseListQuery {
            search: Some("rust".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filters.limit, 10);
        assert_eq!(filters.search.as_deref(), Some("rust"));
    }

    #[test]
    fn list_query_rejects_out_of_range_limit() {
        for limit in [0, 101, -5] {
            let result = parse_list_query(&CourseListQuery {
                limit: Some(limit),
                ..Default::default()
            });
            assert!(result.is_err(), "limit {limit} should be rejected");
        }
    }

    #[test]
    fn list_query_rejects_bad_cursor() {
        let result = parse_list_query(&CourseListQuery {
            cursor: Some("not-a-uuid".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn unparseable_course_id_reads_as_not_found() {
        let err = parse_course_id("definitely-not-a-uuid").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
