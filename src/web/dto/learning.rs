use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{
    Course, CourseWithProgressRow, ModuleWithProgressRow, ProgressSummary, UserProgress,
};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseOverview {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub level: String,
    pub credits: i32,
    pub order_index: i32,
    pub module_count: i64,
    pub completed_modules: i64,
    pub completed: bool,
}

impl From<CourseWithProgressRow> for CourseOverview {
    fn from(row: CourseWithProgressRow) -> Self {
        Self {
            completed: row.completed(),
            id: row.id,
            title: row.title,
            description: row.description,
            level: row.level,
            credits: row.credits,
            order_index: row.order_index,
            module_count: row.module_count,
            completed_modules: row.completed_modules,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleProgressView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub module_order: i32,
    pub duration_minutes: i32,
    pub completed: bool,
    pub score: Option<i32>,
}

impl From<ModuleWithProgressRow> for ModuleProgressView {
    fn from(row: ModuleWithProgressRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            module_order: row.module_order,
            duration_minutes: row.duration_minutes,
            completed: row.completed,
            score: row.score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseDetail {
    pub course: Course,
    pub modules: Vec<ModuleProgressView>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressOverview {
    pub progress: Vec<UserProgress>,
    pub summary: ProgressSummary,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProgressBody {
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub completed: bool,
    pub score: Option<i32>,
}

/// Module payload for a course given in the path.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ModuleBody {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub module_order: Option<i32>,
    pub duration_minutes: Option<i32>,
}
