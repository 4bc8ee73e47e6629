use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::grading::{Grade, SubmittedAnswer},
    model::entity::{Quiz, QuizQuestion},
};

/// A question as shown to the quiz taker: no answer, no explanation.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub question_order: i32,
}

impl From<&QuizQuestion> for QuestionView {
    fn from(q: &QuizQuestion) -> Self {
        Self {
            id: q.id(),
            question: q.question().to_string(),
            options: q.options().to_vec(),
            question_order: q.question_order(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub passing_score: i32,
    pub time_limit_minutes: Option<i32>,
    pub questions: Vec<QuestionView>,
}

impl QuizView {
    pub fn new(quiz: &Quiz, questions: &[QuizQuestion]) -> Self {
        Self {
            id: quiz.id(),
            course_id: quiz.course_id(),
            module_id: quiz.module_id(),
            title: quiz.title().to_string(),
            description: quiz.description().to_string(),
            passing_score: quiz.passing_score(),
            time_limit_minutes: quiz.time_limit_minutes(),
            questions: questions.iter().map(QuestionView::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitBody {
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken_seconds: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub selected_answer: Option<i32>,
    pub correct_answer: i32,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub result_id: Uuid,
    pub score: i32,
    pub passed: bool,
    pub passing_score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub results: Vec<QuestionResult>,
}

impl SubmitResponse {
    /// `grade.answers` are in the same order as `questions`.
    pub fn new(result_id: Uuid, passing_score: i32, grade: Grade, questions: &[QuizQuestion]) -> Self {
        let results = grade
            .answers
            .into_iter()
            .zip(questions)
            .map(|(graded, question)| QuestionResult {
                question_id: graded.question_id,
                selected_answer: graded.selected_answer,
                correct_answer: graded.correct_answer,
                is_correct: graded.is_correct,
                explanation: question.explanation().to_string(),
            })
            .collect();

        Self {
            result_id,
            score: grade.score,
            passed: grade.passed,
            passing_score,
            correct_count: grade.correct_count,
            total_questions: grade.total_questions,
            results,
        }
    }
}

/// Question payload for a quiz given in the path.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QuestionBody {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[serde(default)]
    pub explanation: String,
    pub question_order: Option<i32>,
}
