use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::grading::{Grade, GradedAnswer};
use crate::model::access::HasOwner;
use crate::model::entity::{Quiz, ScoreMerge, UserProgress, UserProgressUpsert};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

/// One recorded quiz attempt. Attempts are never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizResult {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    score: i32,
    passed: bool,
    correct_count: i32,
    total_questions: i32,
    #[sqlx(json)]
    answers: Vec<GradedAnswer>,
    time_taken_seconds: Option<i32>,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for QuizResult {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizResult
    }
}

impl QuizResult {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Stores an attempt at `quiz`. A passed attempt at a module quiz also
    /// completes the module, keeping the best score, in the same transaction.
    pub async fn record(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz: &Quiz,
        grade: &Grade,
        time_taken_seconds: Option<i32>,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        let result: QuizResult = sqlx::query_as(
            r#"
            INSERT INTO quiz_results
                (id, user_id, quiz_id, score, passed, correct_count, total_questions, answers, time_taken_seconds)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(quiz.id())
        .bind(grade.score)
        .bind(grade.passed)
        .bind(grade.correct_count)
        .bind(grade.total_questions)
        .bind(Json(&grade.answers))
        .bind(time_taken_seconds)
        .fetch_one(&mut *tx)
        .await?;

        if let (true, Some(module_id)) = (grade.passed, quiz.module_id()) {
            UserProgress::upsert_in(
                &mut tx,
                actor.user_id(),
                UserProgressUpsert {
                    course_id: quiz.course_id(),
                    module_id,
                    completed: true,
                    score: Some(grade.score),
                },
                ScoreMerge::KeepBest,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(result)
    }

    /// The actor's attempts at `quiz_id`, newest first.
    pub async fn history(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            "SELECT * FROM quiz_results WHERE user_id = $1 AND quiz_id = $2 ORDER BY created_at DESC",
        )
        .bind(actor.user_id())
        .bind(quiz_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl HasOwner for QuizResult {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct BestScore {
    pub best_score: Option<i32>,
    pub attempts: i64,
}

impl BestScore {
    pub async fn fetch(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Self> {
        let best = sqlx::query_as(
            r#"
            SELECT MAX(score) AS best_score, COUNT(*) AS attempts
            FROM quiz_results
            WHERE user_id = $1 AND quiz_id = $2
            "#,
        )
        .bind(actor.user_id())
        .bind(quiz_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(best)
    }
}

/// Aggregates over every user's attempts. `pass_rate` is a percentage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizStatistics {
    pub total_attempts: i64,
    pub unique_users: i64,
    pub average_score: f64,
    pub pass_rate: f64,
}

impl QuizStatistics {
    pub async fn fetch(mm: &ModelManager, quiz_id: Uuid) -> DatabaseResult<Self> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_attempts,
                COUNT(DISTINCT user_id) AS unique_users,
                COALESCE(ROUND(AVG(score), 2), 0)::FLOAT8 AS average_score,
                COALESCE(ROUND(AVG(CASE WHEN passed THEN 100.0 ELSE 0.0 END), 2), 0)::FLOAT8 AS pass_rate
            FROM quiz_results
            WHERE quiz_id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(stats)
    }
}
