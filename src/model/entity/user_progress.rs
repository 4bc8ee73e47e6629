use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserProgress {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    module_id: Uuid,
    completed: bool,
    score: Option<i32>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// How an upsert treats a score already stored for the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMerge {
    /// The new score wins; a missing one keeps the stored score.
    Replace,
    /// The higher of both scores is kept.
    KeepBest,
}

#[derive(Debug)]
pub struct UserProgressUpsert {
    pub course_id: Uuid,
    pub module_id: Uuid,
    pub completed: bool,
    pub score: Option<i32>,
}

impl ResourceTyped for UserProgress {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::UserProgress
    }
}

impl UserProgress {
    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn score(&self) -> Option<i32> {
        self.score
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        self.completed_at.as_ref()
    }

    /// Inserts or updates the actor's row for `data.module_id`.
    ///
    /// `completed_at` is stamped the first time the module is completed and
    /// cleared when it is marked incomplete again. A missing score keeps the
    /// stored one.
    pub async fn upsert(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: UserProgressUpsert,
    ) -> DatabaseResult<Self> {
        let mut conn = mm.executor().acquire().await?;
        Self::upsert_in(&mut conn, actor.user_id(), data, ScoreMerge::Replace).await
    }

    pub(crate) async fn upsert_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        data: UserProgressUpsert,
        merge: ScoreMerge,
    ) -> DatabaseResult<Self> {
        let progress = sqlx::query_as(
            r#"
            INSERT INTO user_progress
                (id, user_id, course_id, module_id, completed, score, completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $5 THEN now() END, now())
            ON CONFLICT (user_id, module_id) DO UPDATE SET
                course_id = EXCLUDED.course_id,
                completed = EXCLUDED.completed,
                score = CASE
                    WHEN $7 THEN GREATEST(user_progress.score, EXCLUDED.score)
                    ELSE COALESCE(EXCLUDED.score, user_progress.score)
                END,
                completed_at = CASE
                    WHEN EXCLUDED.completed THEN COALESCE(user_progress.completed_at, now())
                END,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.course_id)
        .bind(data.module_id)
        .bind(data.completed)
        .bind(data.score)
        .bind(merge == ScoreMerge::KeepBest)
        .fetch_one(&mut *conn)
        .await?;

        Ok(progress)
    }

    pub async fn all_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            "SELECT * FROM user_progress WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl HasOwner for UserProgress {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

/// Totals across every course for one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ProgressSummary {
    pub total_credits: i64,
    pub completed_courses: i64,
    pub completed_modules: i64,
    pub total_modules: i64,
}

impl ProgressSummary {
    /// A course counts as completed once it has modules and all of them are done.
    pub async fn fetch(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let summary = sqlx::query_as(
            r#"
            WITH course_stats AS (
                SELECT
                    c.id,
                    c.credits,
                    COUNT(m.id) AS total,
                    COUNT(up.id) FILTER (WHERE up.completed) AS done
                FROM courses c
                LEFT JOIN modules m ON m.course_id = c.id
                LEFT JOIN user_progress up
                    ON up.module_id = m.id
                    AND up.user_id = $1
                GROUP BY c.id
            )
            SELECT
                COALESCE(SUM(credits) FILTER (WHERE total > 0 AND done = total), 0)::BIGINT AS total_credits,
                COUNT(*) FILTER (WHERE total > 0 AND done = total) AS completed_courses,
                COALESCE(SUM(done), 0)::BIGINT AS completed_modules,
                COALESCE(SUM(total), 0)::BIGINT AS total_modules
            FROM course_stats
            "#,
        )
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;

        Ok(summary)
    }
}
