//! Quiz scoring.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stored correct option of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerKey {
    pub question_id: Uuid,
    pub correct_answer: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected_answer: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected_answer: Option<i32>,
    pub correct_answer: i32,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    /// Percentage in `0..=100`.
    pub score: i32,
    pub correct_count: i32,
    pub total_questions: i32,
    pub passed: bool,
    /// One entry per question, in key order.
    pub answers: Vec<GradedAnswer>,
}

/// Grades `answers` against `keys`.
///
/// Unanswered questions count as wrong, answers to unknown questions are
/// ignored and a question answered twice keeps the last answer.
pub fn grade(keys: &[AnswerKey], answers: &[SubmittedAnswer], passing_score: i32) -> Grade {
    let selected: HashMap<Uuid, i32> = answers
        .iter()
        .map(|a| (a.question_id, a.selected_answer))
        .collect();

    let graded: Vec<GradedAnswer> = keys
        .iter()
        .map(|key| {
            let selected_answer = selected.get(&key.question_id).copied();
            GradedAnswer {
                question_id: key.question_id,
                selected_answer,
                correct_answer: key.correct_answer,
                is_correct: selected_answer == Some(key.correct_answer),
            }
        })
        .collect();

    let total = graded.len() as i32;
    let correct = graded.iter().filter(|g| g.is_correct).count() as i32;
    let score = percentage(correct, total);

    Grade {
        score,
        correct_count: correct,
        total_questions: total,
        passed: total > 0 && score >= passing_score,
        answers: graded,
    }
}

fn percentage(correct: i32, total: i32) -> i32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) / f64::from(total) * 100.0).round() as i32
}
