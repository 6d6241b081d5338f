use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::courses::repo::Difficulty;

/// Enrollment row. At most one row exists per (student_email, course_id)
/// pair; re-enrollment flips `is_active` back on instead of inserting.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_email: String,
    pub course_id: Uuid,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

/// Student-listing row: enrollment joined with its course summary, flat.
#[derive(Debug, Clone, FromRow)]
pub struct StudentEnrollmentRow {
    pub id: Uuid,
    pub student_email: String,
    pub course_id: Uuid,
    pub is_active: bool,
    pub enrolled_at: OffsetDateTime,
    pub course_title: String,
    pub course_description: String,
    pub course_difficulty: Difficulty,
    pub course_is_active: bool,
}

const ENROLLMENT_COLUMNS: &str = "id, student_email, course_id, is_active, enrolled_at";

impl Enrollment {
    pub async fn create(
        db: &PgPool,
        student_email: &str,
        course_id: Uuid,
    ) -> Result<Enrollment, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            INSERT INTO enrollments (student_email, course_id)
            VALUES ($1, $2)
            RETURNING {ENROLLMENT_COLUMNS}
            "#,
        ))
        .bind(student_email)
        .bind(course_id)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_pair(
        db: &PgPool,
        student_email: &str,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_email = $1 AND course_id = $2"
        ))
        .bind(student_email)
        .bind(course_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_student(
        db: &PgPool,
        student_email: &str,
    ) -> Result<Vec<StudentEnrollmentRow>, sqlx::Error> {
        sqlx::query_as::<_, StudentEnrollmentRow>(
            r#"
            SELECT e.id, e.student_email, e.course_id, e.is_active, e.enrolled_at,
                   c.title AS course_title, c.description AS course_description,
                   c.difficulty AS course_difficulty, c.is_active AS course_is_active
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.student_email = $1 AND e.is_active
            ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(student_email)
        .fetch_all(db)
        .await
    }

    /// Reactivation and soft delete are the same toggle.
    pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> Result<Enrollment, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            UPDATE enrollments SET is_active = $2
            WHERE id = $1
            RETURNING {ENROLLMENT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(active)
        .fetch_one(db)
        .await
    }

    pub async fn count_all(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(db)
            .await
    }

    pub async fn count_active(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE is_active")
            .fetch_one(db)
            .await
    }

    /// Active enrollments grouped by course; difficulty is resolved per
    /// group by the caller.
    pub async fn count_active_by_course(db: &PgPool) -> Result<Vec<(Uuid, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT course_id, COUNT(*)
            FROM enrollments
            WHERE is_active
            GROUP BY course_id
            "#,
        )
        .fetch_all(db)
        .await
    }
}
