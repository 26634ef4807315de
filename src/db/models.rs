use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Trainer,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    InProgress,
    Completed,
    Dropped,
}

/// One row per upload; the active template has the latest `updated_at`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    pub id: Uuid,
    pub template_url: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateLayout {
    pub show_user_name: bool,
    pub show_course_name: bool,
    pub show_certificate_id: bool,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            show_user_name: true,
            show_course_name: true,
            show_certificate_id: true,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub certificate_template_url: Option<String>,
    pub certificate_template_config: Option<sqlx::types::Json<TemplateLayout>>,
}

impl Course {
    pub fn template_layout(&self) -> TemplateLayout {
        self.certificate_template_config
            .as_ref()
            .map(|c| c.0)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LearnerCourseRecord {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: CourseStatus,
    pub certificate_id: Option<String>,
    pub certificate_image_url: Option<String>,
}

impl LearnerCourseRecord {
    pub fn is_completed(&self) -> bool {
        self.status == CourseStatus::Completed
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct Learner {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub courses: Vec<LearnerCourseRecord>,
}

impl Learner {
    pub fn course(&self, course_id: Uuid) -> Option<&LearnerCourseRecord> {
        self.courses.iter().find(|c| c.course_id == course_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTemplate {
    pub course_id: Uuid,
    pub certificate_template_url: Option<String>,
    pub certificate_template_config: TemplateLayout,
}

impl From<&Course> for CourseTemplate {
    fn from(course: &Course) -> Self {
        Self {
            course_id: course.id,
            certificate_template_url: course.certificate_template_url.clone(),
            certificate_template_config: course.template_layout(),
        }
    }
}
