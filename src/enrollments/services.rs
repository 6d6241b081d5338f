use std::collections::BTreeMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::courses::repo::Course;
use crate::enrollments::dto::{EnrollmentStats, EnrollmentWithCourse, StudentEnrollment};
use crate::enrollments::repo::Enrollment;
use crate::error::ApiError;

#[derive(Debug, PartialEq, Eq)]
enum EnrollmentPlan {
    /// Flip the existing row back on, keeping its id.
    Reactivate(Uuid),
    Create,
}

/// Decides how an enrollment request lands once the course and any prior row
/// for the pair are known: inactive courses reject, an active row conflicts,
/// an inactive row is reactivated in place, otherwise a new row is inserted.
fn plan_enrollment(
    course: &Course,
    existing: Option<&Enrollment>,
) -> Result<EnrollmentPlan, ApiError> {
    if !course.is_active {
        return Err(ApiError::BadRequest(
            "Course is not available for enrollment".to_string(),
        ));
    }
    match existing {
        Some(e) if e.is_active => Err(ApiError::Conflict(
            "Student is already enrolled in this course".to_string(),
        )),
        Some(e) => Ok(EnrollmentPlan::Reactivate(e.id)),
        None => Ok(EnrollmentPlan::Create),
    }
}

fn check_unenroll(existing: Option<Enrollment>) -> Result<Enrollment, ApiError> {
    let enrollment =
        existing.ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;
    if !enrollment.is_active {
        return Err(ApiError::BadRequest(
            "Student is not currently enrolled in this course".to_string(),
        ));
    }
    Ok(enrollment)
}

/// Enroll a student, reactivating an earlier unenrollment in place: the pair
/// keeps its original row (and id) across enroll/unenroll cycles. The unique
/// (student_email, course_id) constraint backstops this under races.
pub async fn create_enrollment(
    db: &PgPool,
    student_email: &str,
    course_id: Uuid,
) -> Result<EnrollmentWithCourse, ApiError> {
    let course = Course::find_by_id(db, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    if User::find_by_email(db, student_email).await?.is_none() {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    let existing = Enrollment::find_by_pair(db, student_email, course_id).await?;
    let enrollment = match plan_enrollment(&course, existing.as_ref())? {
        EnrollmentPlan::Reactivate(id) => {
            info!(enrollment_id = %id, %student_email, "re-enrollment, reactivating row");
            Enrollment::set_active(db, id, true).await?
        }
        EnrollmentPlan::Create => Enrollment::create(db, student_email, course_id).await?,
    };

    info!(enrollment_id = %enrollment.id, %student_email, %course_id, "student enrolled");
    Ok(EnrollmentWithCourse { enrollment, course })
}

pub async fn get_student_enrollments(
    db: &PgPool,
    student_email: &str,
) -> Result<Vec<StudentEnrollment>, ApiError> {
    if User::find_by_email(db, student_email).await?.is_none() {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    let rows = Enrollment::find_by_student(db, student_email).await?;
    Ok(rows.into_iter().map(StudentEnrollment::from).collect())
}

pub async fn get_enrollment_by_id(db: &PgPool, id: Uuid) -> Result<EnrollmentWithCourse, ApiError> {
    let enrollment = Enrollment::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;
    let course = Course::find_by_id(db, enrollment.course_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(EnrollmentWithCourse { enrollment, course })
}

pub async fn unenroll_student(
    db: &PgPool,
    student_email: &str,
    course_id: Uuid,
) -> Result<EnrollmentWithCourse, ApiError> {
    let existing = Enrollment::find_by_pair(db, student_email, course_id).await?;
    let enrollment = check_unenroll(existing)?;
    let enrollment = Enrollment::set_active(db, enrollment.id, false).await?;
    let course = Course::find_by_id(db, course_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    info!(enrollment_id = %enrollment.id, %student_email, %course_id, "student unenrolled");
    Ok(EnrollmentWithCourse { enrollment, course })
}

/// Difficulty totals are resolved with one course lookup per group rather
/// than a single joined aggregate, mirroring the per-group shape of the data.
pub async fn get_enrollment_stats(db: &PgPool) -> Result<EnrollmentStats, ApiError> {
    let total_enrollments = Enrollment::count_all(db).await?;
    let active_enrollments = Enrollment::count_active(db).await?;

    let mut enrollments_by_difficulty: BTreeMap<String, i64> = BTreeMap::new();
    for (course_id, count) in Enrollment::count_active_by_course(db).await? {
        if let Some(course) = Course::find_by_id(db, course_id).await? {
            *enrollments_by_difficulty
                .entry(course.difficulty.as_str().to_string())
                .or_insert(0) += count;
        }
    }

    Ok(EnrollmentStats {
        total_enrollments,
        active_enrollments,
        enrollments_by_difficulty,
    })
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::courses::repo::Difficulty;

    fn course(is_active: bool) -> Course {
        let now = OffsetDateTime::now_utc();
        Course {
            id: Uuid::new_v4(),
            title: "Rust for Backend Engineers".into(),
            description: "Ownership, borrowing, and async services.".into(),
            difficulty: Difficulty::Intermediate,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn enrollment(is_active: bool) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            student_email: "student1@example.com".into(),
            course_id: Uuid::new_v4(),
            is_active,
            enrolled_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn enrolling_into_inactive_course_is_rejected() {
        let err = plan_enrollment(&course(false), None).unwrap_err();
        let ApiError::BadRequest(msg) = err else {
            panic!("expected bad request");
        };
        assert_eq!(msg, "Course is not available for enrollment");
    }

    #[test]
    fn duplicate_active_enrollment_conflicts() {
        let existing = enrollment(true);
        let err = plan_enrollment(&course(true), Some(&existing)).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn reenrollment_reuses_the_original_row() {
        let existing = enrollment(false);
        let plan = plan_enrollment(&course(true), Some(&existing)).unwrap();
        assert_eq!(plan, EnrollmentPlan::Reactivate(existing.id));
    }

    #[test]
    fn first_enrollment_inserts_a_new_row() {
        let plan = plan_enrollment(&course(true), None).unwrap();
        assert_eq!(plan, EnrollmentPlan::Create);
    }

    #[test]
    fn unenroll_without_a_row_is_not_found() {
        let err = check_unenroll(None).unwrap_err();
        let ApiError::NotFound(msg) = err else {
            panic!("expected not found");
        };
        assert_eq!(msg, "Enrollment not found");
    }

    #[test]
    fn unenroll_of_inactive_row_is_rejected() {
        let err = check_unenroll(Some(enrollment(false))).unwrap_err();
        let ApiError::BadRequest(msg) = err else {
            panic!("expected bad request");
        };
        assert_eq!(msg, "Student is not currently enrolled in this course");
    }

    #[test]
    fn unenroll_of_active_row_passes_through() {
        let existing = enrollment(true);
        let id = existing.id;
        let checked = check_unenroll(Some(existing)).unwrap();
        assert_eq!(checked.id, id);
    }
}
