use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::courses::dto::PaginationResult;

/// Course difficulty, stored as the `difficulty` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "difficulty")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Beginner" => Some(Difficulty::Beginner),
            "Intermediate" => Some(Difficulty::Intermediate),
            "Advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Listing row: course plus its live enrollment count.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseWithCount {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub enrollment_count: i64,
}

/// Active enrollment as shown on the course detail view.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub id: Uuid,
    pub student_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilters {
    pub difficulty: Option<Difficulty>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub cursor: Option<Uuid>,
    pub limit: i64,
}

const COURSE_COLUMNS: &str = "id, title, description, difficulty, is_active, created_at, updated_at";

const LISTING_SELECT: &str = "SELECT c.id, c.title, c.description, c.difficulty, c.is_active, \
     c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id AND e.is_active) AS enrollment_count \
     FROM courses c WHERE TRUE";

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filters: &CourseFilters) {
    if let Some(difficulty) = filters.difficulty {
        qb.push(" AND c.difficulty = ").push_bind(difficulty);
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND c.is_active = ").push_bind(is_active);
    }
    if let Some(search) = &filters.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (c.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Keyset pagination over (created_at, id) descending; the cursor is the id
/// of the last row of the previous page.
pub(crate) fn build_list_query(filters: &CourseFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(LISTING_SELECT);
    push_filters(&mut qb, filters);
    if let Some(cursor) = filters.cursor {
        qb.push(" AND (c.created_at, c.id) < (SELECT created_at, id FROM courses WHERE id = ")
            .push_bind(cursor)
            .push(")");
    }
    qb.push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
        .push_bind(filters.limit + 1);
    qb
}

/// Total matching the filter; ignores the pagination window.
pub(crate) fn build_count_query(filters: &CourseFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM courses c WHERE TRUE");
    push_filters(&mut qb, filters);
    qb
}

impl Course {
    pub async fn create(
        db: &PgPool,
        title: &str,
        description: &str,
        difficulty: Difficulty,
    ) -> Result<Course, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, description, difficulty)
            VALUES ($1, $2, $3)
            RETURNING {COURSE_COLUMNS}
            "#,
        ))
        .bind(title)
        .bind(description)
        .bind(difficulty)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn active_enrollments(
        db: &PgPool,
        id: Uuid,
    ) -> Result<Vec<EnrollmentSummary>, sqlx::Error> {
        sqlx::query_as::<_, EnrollmentSummary>(
            r#"
            SELECT id, student_email, enrolled_at
            FROM enrollments
            WHERE course_id = $1 AND is_active
            ORDER BY enrolled_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
    }

    pub async fn find_many(
        db: &PgPool,
        filters: &CourseFilters,
    ) -> Result<PaginationResult<CourseWithCount>, sqlx::Error> {
        let mut rows: Vec<CourseWithCount> = build_list_query(filters)
            .build_query_as()
            .fetch_all(db)
            .await?;

        let has_more = rows.len() as i64 > filters.limit;
        if has_more {
            rows.truncate(filters.limit as usize);
        }
        let next_cursor = if has_more {
            rows.last().map(|c| c.id)
        } else {
            None
        };

        let total: i64 = build_count_query(filters)
            .build_query_scalar()
            .fetch_one(db)
            .await?;

        Ok(PaginationResult {
            data: rows,
            next_cursor,
            has_more,
            total,
        })
    }

    pub async fn find_all_active(db: &PgPool) -> Result<Vec<CourseWithCount>, sqlx::Error> {
        let mut qb = QueryBuilder::new(LISTING_SELECT);
        qb.push(" AND c.is_active ORDER BY c.created_at DESC, c.id DESC");
        qb.build_query_as().fetch_all(db).await
    }

    pub async fn soft_delete(db: &PgPool, id: Uuid) -> Result<Course, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses SET is_active = FALSE, updated_at = now()
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_one(db)
        .await
    }

    pub async fn hard_delete(db: &PgPool, id: Uuid) -> Result<Course, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            "DELETE FROM courses WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> CourseFilters {
        CourseFilters {
            limit: 10,
            ..Default::default()
        }
    }

    #[test]
    fn list_query_without_filters_orders_newest_first() {
        let qb = build_list_query(&filters());
        let sql = qb.sql();
        assert!(sql.contains("ORDER BY c.created_at DESC, c.id DESC"));
        assert!(!sql.contains("ILIKE"));
        assert!(!sql.contains("c.difficulty ="));
    }

    #[test]
    fn list_query_adds_search_over_title_and_description() {
        let qb = build_list_query(&CourseFilters {
            search: Some("rust".into()),
            ..filters()
        });
        let sql = qb.sql();
        assert!(sql.contains("c.title ILIKE"));
        assert!(sql.contains("c.description ILIKE"));
    }

    #[test]
    fn list_query_adds_cursor_predicate() {
        let qb = build_list_query(&CourseFilters {
            cursor: Some(Uuid::new_v4()),
            ..filters()
        });
        assert!(qb.sql().contains("(c.created_at, c.id) <"));
    }

    #[test]
    fn count_query_has_no_pagination_window() {
        let qb = build_count_query(&CourseFilters {
            difficulty: Some(Difficulty::Advanced),
            cursor: Some(Uuid::new_v4()),
            ..filters()
        });
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("(c.created_at, c.id) <"));
    }

    #[test]
    fn difficulty_parse_is_exact() {
        assert_eq!(Difficulty::parse("Beginner"), Some(Difficulty::Beginner));
        assert_eq!(Difficulty::parse("Advanced"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("beginner"), None);
        assert_eq!(Difficulty::parse("Expert"), None);
    }
}
