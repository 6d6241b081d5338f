use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::courses::repo::{Course, EnrollmentSummary};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub difficulty: Option<String>,
}

/// Query parameters for `GET /api/courses`. Everything is optional; an empty
/// query string selects the unpaginated active listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListQuery {
    pub difficulty: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl CourseListQuery {
    pub fn is_empty(&self) -> bool {
        self.difficulty.is_none()
            && self.limit.is_none()
            && self.cursor.is_none()
            && self.search.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub difficulty: Option<String>,
}

/// Cursor-paginated page: `total` counts every row matching the filter,
/// not just this window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult<T> {
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
    pub total: i64,
}

/// Course detail: the record plus its currently-active enrollments.
#[derive(Debug, Serialize)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: Course,
    pub enrollments: Vec<EnrollmentSummary>,
}
