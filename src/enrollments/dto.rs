use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::courses::repo::{Course, Difficulty};
use crate::enrollments::repo::{Enrollment, StudentEnrollmentRow};

/// Body for both enrolling and unenrolling. `courseId` stays a raw string so
/// an unparseable id reads as an absent course, not a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollmentRequest {
    pub student_email: String,
    pub course_id: String,
}

/// Enrollment with the full course record attached.
#[derive(Debug, Serialize)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: Course,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub is_active: bool,
}

/// Row of `GET /api/enrollments/student/:email`.
#[derive(Debug, Serialize)]
pub struct StudentEnrollment {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseSummary,
}

impl From<StudentEnrollmentRow> for StudentEnrollment {
    fn from(row: StudentEnrollmentRow) -> Self {
        Self {
            course: CourseSummary {
                id: row.course_id,
                title: row.course_title,
                description: row.course_description,
                difficulty: row.course_difficulty,
                is_active: row.course_is_active,
            },
            enrollment: Enrollment {
                id: row.id,
                student_email: row.student_email,
                course_id: row.course_id,
                is_active: row.is_active,
                enrolled_at: row.enrolled_at,
            },
        }
    }
}

/// Aggregate stats for the admin overview.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStats {
    pub total_enrollments: i64,
    pub active_enrollments: i64,
    pub enrollments_by_difficulty: BTreeMap<String, i64>,
}
