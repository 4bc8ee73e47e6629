mod common;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, login_admin_action, register_action, setup_server, setup_test_db,
};

fn course_path(ctx: &FlowContext, suffix: &str) -> String {
    format!("/api/v1/learning/courses/{}{suffix}", ctx.get_str("course", "/id"))
}

fn quiz_path(ctx: &FlowContext, suffix: &str) -> String {
    format!("/api/v1/quiz/{}{suffix}", ctx.get_str("quiz", "/id"))
}

fn easy_path(ctx: &FlowContext, suffix: &str) -> String {
    format!("/api/v1/quiz/{}{suffix}", ctx.get_str("easy", "/id"))
}

fn answer(ctx: &FlowContext, question: &'static str, selected: i32) -> Value {
    json!({ "question_id": ctx.get_str(question, "/id"), "selected_answer": selected })
}

/// Admin builds a course with one module and a two-question quiz on it.
/// Stores `course`, `module`, `quiz`, `q1` (answer 1) and `q2` (answer 0).
fn seed_quiz(flow: Flow) -> Flow {
    flow.step(login_admin_action().with_clear_cookies(true))
        .step(
            Action::new("create_course", "POST", "/api/v1/learning/courses")
                .with_body(json!({ "title": "Risk", "credits": 2 }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("course"),
        )
        .step(
            Action::new("create_module", "POST", "dynamic")
                .with_dyn_path(|ctx| course_path(ctx, "/modules"))
                .with_body(json!({ "title": "Volatility" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("module"),
        )
        .step(
            Action::new("create_quiz", "POST", "/api/v1/quiz")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_str("course", "/id"),
                        "module_id": ctx.get_str("module", "/id"),
                        "title": "Volatility check",
                    })
                })
                .with_expect(StatusCode::CREATED)
                .assert_json(|body| assert_eq!(body["passing_score"], 70))
                .with_save_as("quiz"),
        )
        .step(
            Action::new("add_q1", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/questions"))
                .with_body(json!({
                    "question": "Which asset is usually more volatile?",
                    "options": ["Treasury bills", "Small-cap stocks", "Savings account"],
                    "correct_answer": 1,
                    "explanation": "Small companies swing more.",
                    "question_order": 1,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("q1"),
        )
        .step(
            Action::new("add_q2", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/questions"))
                .with_body(json!({
                    "question": "Does diversification lower risk?",
                    "options": ["Yes", "No"],
                    "correct_answer": 0,
                    "question_order": 2,
                }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("q2"),
        )
}

#[tokio::test]
async fn route_quiz_view_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    seed_quiz(Flow::new())
        .step(register_action("taker", "taker123").with_clear_cookies(true))
        .step(
            Action::new("get_quiz", "GET", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, ""))
                .assert_json(|body| {
                    let questions = body["questions"].as_array().expect("questions");
                    assert_eq!(questions.len(), 2);
                    assert_eq!(questions[0]["options"].as_array().map(Vec::len), Some(3));
                    // answers stay hidden
                    assert!(questions[0].get("correct_answer").is_none());
                    assert!(questions[0].get("explanation").is_none());
                }),
        )
        .step(
            Action::new("get_missing_quiz", "GET", "dynamic")
                .with_dyn_path(|_| format!("/api/v1/quiz/{}", uuid::Uuid::new_v4()))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_quiz_submit_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    seed_quiz(Flow::new())
        .step(register_action("taker", "taker123").with_clear_cookies(true))
        // one right, one wrong
        .step(
            Action::new("submit_half", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/submit"))
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [answer(ctx, "q1", 1), answer(ctx, "q2", 1)],
                        "time_taken_seconds": 42,
                    })
                })
                .assert_json(|body| {
                    assert_eq!(body["score"], 50);
                    assert_eq!(body["passed"], false);
                    assert_eq!(body["correct_count"], 1);
                    assert_eq!(body["total_questions"], 2);
                    assert_eq!(body["results"][0]["is_correct"], true);
                    assert_eq!(body["results"][0]["explanation"], "Small companies swing more.");
                    assert_eq!(body["results"][1]["is_correct"], false);
                    assert_eq!(body["results"][1]["correct_answer"], 0);
                }),
        )
        .step(
            Action::new("progress_untouched", "GET", "/api/v1/learning/progress")
                .assert_json(|body| assert_eq!(body["summary"]["completed_modules"], 0)),
        )
        // q2 unanswered counts as wrong, unknown question ignored
        .step(
            Action::new("submit_partial", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/submit"))
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [
                            answer(ctx, "q1", 1),
                            { "question_id": uuid::Uuid::new_v4(), "selected_answer": 0 },
                        ],
                    })
                })
                .assert_json(|body| {
                    assert_eq!(body["score"], 50);
                    assert!(body["results"][1]["selected_answer"].is_null());
                }),
        )
        // last answer wins
        .step(
            Action::new("submit_pass", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/submit"))
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [answer(ctx, "q1", 1), answer(ctx, "q2", 1), answer(ctx, "q2", 0)],
                    })
                })
                .assert_json(|body| {
                    assert_eq!(body["score"], 100);
                    assert_eq!(body["passed"], true);
                }),
        )
        // passing completes the quiz's module
        .step(
            Action::new("progress_completed", "GET", "/api/v1/learning/progress").assert_json(|body| {
                assert_eq!(body["summary"]["completed_modules"], 1);
                assert_eq!(body["summary"]["total_credits"], 2);
                assert_eq!(body["progress"][0]["score"], 100);
            }),
        )
        .step(
            Action::new("best_score", "GET", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/best-score"))
                .assert_json(|body| {
                    assert_eq!(body["best_score"], 100);
                    assert_eq!(body["attempts"], 3);
                }),
        )
        .step(
            Action::new("results", "GET", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/results"))
                .assert_json(|body| {
                    let attempts = body.as_array().expect("attempts");
                    assert_eq!(attempts.len(), 3);
                    // newest first
                    assert_eq!(attempts[0]["score"], 100);
                    assert_eq!(attempts[2]["time_taken_seconds"], 42);
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_quiz_statistics_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    seed_quiz(Flow::new())
        .step(register_action("alice", "alice123").with_clear_cookies(true))
        .step(
            Action::new("best_score_empty", "GET", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/best-score"))
                .assert_json(|body| {
                    assert!(body["best_score"].is_null());
                    assert_eq!(body["attempts"], 0);
                }),
        )
        .step(
            Action::new("alice_submit", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/submit"))
                .with_dyn_body(|ctx| json!({ "answers": [answer(ctx, "q1", 1), answer(ctx, "q2", 0)] })),
        )
        .step(register_action("bob", "bob12345").with_clear_cookies(true))
        .step(
            Action::new("bob_submit", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/submit"))
                .with_body(json!({ "answers": [] }))
                .assert_json(|body| assert_eq!(body["score"], 0)),
        )
        .step(
            Action::new("statistics", "GET", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/statistics"))
                .assert_json(|body| {
                    assert_eq!(body["total_attempts"], 2);
                    assert_eq!(body["unique_users"], 2);
                    assert_eq!(body["average_score"], 50.0);
                    assert_eq!(body["pass_rate"], 50.0);
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_quiz_admin_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    seed_quiz(Flow::new())
        .step(
            Action::new("question_out_of_range", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "/questions"))
                .with_body(json!({ "question": "?", "options": ["a", "b"], "correct_answer": 2 }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("quiz_bad_passing_score", "POST", "/api/v1/quiz")
                .with_dyn_body(|ctx| {
                    json!({ "course_id": ctx.get_str("course", "/id"), "title": "x", "passing_score": 120 })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("quiz_missing_course", "POST", "/api/v1/quiz")
                .with_body(json!({ "course_id": uuid::Uuid::new_v4(), "title": "x" }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("create_empty_quiz", "POST", "/api/v1/quiz")
                .with_dyn_body(|ctx| json!({ "course_id": ctx.get_str("course", "/id"), "title": "Empty" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("empty"),
        )
        .step(register_action("taker", "taker123").with_clear_cookies(true))
        .step(
            Action::new("submit_empty_quiz", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quiz/{}/submit", ctx.get_str("empty", "/id")))
                .with_body(json!({ "answers": [] }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("create_quiz_forbidden", "POST", "/api/v1/quiz")
                .with_dyn_body(|ctx| json!({ "course_id": ctx.get_str("course", "/id"), "title": "Mine" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_quiz_retake_keeps_best_module_score_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    seed_quiz(Flow::new())
        // a second quiz on the same module that passes at 50
        .step(
            Action::new("create_easy_quiz", "POST", "/api/v1/quiz")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": ctx.get_str("course", "/id"),
                        "module_id": ctx.get_str("module", "/id"),
                        "title": "Volatility warm-up",
                        "passing_score": 50,
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("easy"),
        )
        .step(
            Action::new("add_e1", "POST", "dynamic")
                .with_dyn_path(|ctx| easy_path(ctx, "/questions"))
                .with_body(json!({ "question": "Is cash volatile?", "options": ["No", "Yes"], "correct_answer": 0 }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("e1"),
        )
        .step(
            Action::new("add_e2", "POST", "dynamic")
                .with_dyn_path(|ctx| easy_path(ctx, "/questions"))
                .with_body(json!({ "question": "Can stocks fall?", "options": ["Yes", "No"], "correct_answer": 0 }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("e2"),
        )
        .step(register_action("retaker", "retaker1").with_clear_cookies(true))
        .step(
            Action::new("easy_full_marks", "POST", "dynamic")
                .with_dyn_path(|ctx| easy_path(ctx, "/submit"))
                .with_dyn_body(|ctx| json!({ "answers": [answer(ctx, "e1", 0), answer(ctx, "e2", 0)] }))
                .assert_json(|body| assert_eq!(body["score"], 100)),
        )
        .step(
            Action::new("easy_half_marks", "POST", "dynamic")
                .with_dyn_path(|ctx| easy_path(ctx, "/submit"))
                .with_dyn_body(|ctx| json!({ "answers": [answer(ctx, "e1", 0), answer(ctx, "e2", 1)] }))
                .assert_json(|body| {
                    assert_eq!(body["score"], 50);
                    assert_eq!(body["passed"], true);
                }),
        )
        .step(
            Action::new("progress_keeps_best", "GET", "/api/v1/learning/progress").assert_json(|body| {
                assert_eq!(body["summary"]["completed_modules"], 1);
                assert_eq!(body["progress"][0]["completed"], true);
                assert_eq!(body["progress"][0]["score"], 100);
            }),
        )
        .step(
            Action::new("attempts_recorded", "GET", "dynamic")
                .with_dyn_path(|ctx| easy_path(ctx, "/results"))
                .assert_json(|body| assert_eq!(body.as_array().map(Vec::len), Some(2))),
        )
        .run(&mut server, pool)
        .await;
}
