use crate::domain::grading::AnswerKey;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizQuestion {
    id: Uuid,
    quiz_id: Uuid,
    question: String,
    #[sqlx(json)]
    options: Vec<String>,
    correct_answer: i32,
    explanation: String,
    question_order: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizQuestionCreate {
    pub quiz_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[serde(default)]
    pub explanation: String,
    pub question_order: Option<i32>,
}

impl QuizQuestionCreate {
    /// `correct_answer` must index into `options`.
    pub fn answer_in_range(&self) -> bool {
        usize::try_from(self.correct_answer).is_ok_and(|i| i < self.options.len())
    }
}

impl ResourceTyped for QuizQuestion {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuizQuestion
    }
}

impl QuizQuestion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> i32 {
        self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn question_order(&self) -> i32 {
        self.question_order
    }

    pub fn answer_key(&self) -> AnswerKey {
        AnswerKey {
            question_id: self.id,
            correct_answer: self.correct_answer,
        }
    }

    pub async fn all_by_quiz(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_questions WHERE quiz_id = $1 ORDER BY question_order, id",
        )
        .bind(quiz_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[async_trait]
impl CrudRepository<QuizQuestion, QuizQuestionCreate, Uuid> for QuizQuestion {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizQuestionCreate,
    ) -> DatabaseResult<Self> {
        let question = sqlx::query_as(
            r#"
            INSERT INTO quiz_questions
                (id, quiz_id, question, options, correct_answer, explanation, question_order)
            VALUES (
                $1, $2, $3, $4, $5, $6,
                COALESCE($7, (SELECT COALESCE(MAX(question_order), 0) + 1 FROM quiz_questions WHERE quiz_id = $2))
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.quiz_id)
        .bind(&data.question)
        .bind(Json(&data.options))
        .bind(data.correct_answer)
        .bind(&data.explanation)
        .bind(data.question_order)
        .fetch_one(mm.executor())
        .await?;

        Ok(question)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuizQuestionCreate,
    ) -> DatabaseResult<Self> {
        let question = sqlx::query_as(
            r#"
            UPDATE quiz_questions
            SET question = $1, options = $2, correct_answer = $3, explanation = $4, question_order = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&data.question)
        .bind(Json(&data.options))
        .bind(data.correct_answer)
        .bind(&data.explanation)
        .bind(data.question_order.unwrap_or(self.question_order))
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(question)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM quiz_questions WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM quiz_questions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_questions ORDER BY quiz_id, question_order LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn create(correct_answer: i32, options: usize) -> QuizQuestionCreate {
        QuizQuestionCreate {
            quiz_id: Uuid::nil(),
            question: String::from("What is a dividend?"),
            options: (0..options).map(|i| format!("option {i}")).collect(),
            correct_answer,
            explanation: String::new(),
            question_order: None,
        }
    }

    #[test]
    fn correct_answer_must_index_options() {
        assert!(create(0, 4).answer_in_range());
        assert!(create(3, 4).answer_in_range());
        assert!(!create(4, 4).answer_in_range());
        assert!(!create(-1, 4).answer_in_range());
        assert!(!create(0, 0).answer_in_range());
    }
}
