use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::courses::dto::{CourseDetails, PaginationResult};
use crate::courses::repo::{Course, CourseFilters, CourseWithCount, Difficulty};
use crate::error::ApiError;

pub const SEARCH_PAGE_SIZE: i64 = 50;

pub async fn create_course(
    db: &PgPool,
    title: &str,
    description: &str,
    difficulty: Option<Difficulty>,
) -> Result<Course, ApiError> {
    let course = Course::create(
        db,
        title,
        description,
        difficulty.unwrap_or(Difficulty::Beginner),
    )
    .await?;
    info!(course_id = %course.id, title = %course.title, "course created");
    Ok(course)
}

pub async fn get_course_by_id(db: &PgPool, id: Uuid) -> Result<CourseDetails, ApiError> {
    let course = Course::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
    let enrollments = Course::active_enrollments(db, id).await?;
    Ok(CourseDetails {
        course,
        enrollments,
    })
}

pub async fn list_courses(
    db: &PgPool,
    filters: &CourseFilters,
) -> Result<PaginationResult<CourseWithCount>, ApiError> {
    Ok(Course::find_many(db, filters).await?)
}

pub async fn list_all_active(db: &PgPool) -> Result<Vec<CourseWithCount>, ApiError> {
    Ok(Course::find_all_active(db).await?)
}

/// Search is always scoped to active courses with a fixed page size.
pub async fn search_courses(
    db: &PgPool,
    query: &str,
    difficulty: Option<Difficulty>,
) -> Result<Vec<CourseWithCount>, ApiError> {
    let filters = CourseFilters {
        difficulty,
        is_active: Some(true),
        search: Some(query.to_string()),
        cursor: None,
        limit: SEARCH_PAGE_SIZE,
    };
    Ok(Course::find_many(db, &filters).await?.data)
}

#[derive(Debug, PartialEq, Eq)]
enum DeleteTier {
    Deactivate,
    Purge,
}

fn delete_tier(course: &Course) -> DeleteTier {
    if course.is_active {
        DeleteTier::Deactivate
    } else {
        DeleteTier::Purge
    }
}

/// Two-tier delete, preserved for API compatibility: the first call on an
/// active course only deactivates it; a call on an already-inactive course
/// removes the row for good. Callers cannot distinguish the two intents, so
/// a repeated DELETE silently becomes irreversible.
pub async fn delete_course(db: &PgPool, id: Uuid) -> Result<Course, ApiError> {
    let course = Course::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let deleted = match delete_tier(&course) {
        DeleteTier::Deactivate => Course::soft_delete(db, id).await?,
        DeleteTier::Purge => {
            info!(course_id = %id, "purging inactive course");
            Course::hard_delete(db, id).await?
        }
    };
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn course(is_active: bool) -> Course {
        let now = OffsetDateTime::now_utc();
        Course {
            id: Uuid::new_v4(),
            title: "Rust for Backend Engineers".into(),
            description: "Ownership, borrowing, and async services.".into(),
            difficulty: Difficulty::Beginner,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_delete_only_deactivates() {
        assert_eq!(delete_tier(&course(true)), DeleteTier::Deactivate);
    }

    #[test]
    fn delete_of_inactive_course_purges() {
        // The state a soft-deleted course is left in.
        assert_eq!(delete_tier(&course(false)), DeleteTier::Purge);
    }
}
