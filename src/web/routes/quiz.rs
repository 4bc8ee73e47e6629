use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    domain::grading::{AnswerKey, grade},
    model::{
        CrudRepository, ModelManager, ResourceTyped,
        entity::{
            BestScore, Course, Module, Quiz, QuizCreate, QuizQuestion, QuizQuestionCreate,
            QuizResult, QuizStatistics,
        },
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::quiz::{QuestionBody, QuizView, SubmitBody, SubmitResponse},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(quiz_create_handler))
        .route("/{quiz_id}", get(quiz_get_handler))
        .route("/{quiz_id}/submit", post(quiz_submit_handler))
        .route("/{quiz_id}/best-score", get(quiz_best_score_handler))
        .route("/{quiz_id}/statistics", get(quiz_statistics_handler))
        .route("/{quiz_id}/results", get(quiz_results_handler))
        .route("/{quiz_id}/questions", post(quiz_question_create_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn load_quiz(mm: &ModelManager, user: &AuthenticatedUser, id: Uuid) -> WebResult<Quiz> {
    Quiz::find_by_id(mm, user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Quiz::get_resource_type()))
}

async fn load_questions(
    mm: &ModelManager,
    user: &AuthenticatedUser,
    quiz_id: Uuid,
) -> WebResult<Vec<QuizQuestion>> {
    QuizQuestion::all_by_quiz(mm, user, quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizQuestion::get_resource_type(), e))
}

#[utoipa::path(
    get,
    path = "/api/v1/quiz/{quiz_id}",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    description = "Returns a quiz with its questions, answers withheld",
    responses(
        (status = 200, description = "Quiz with ordered questions", body = QuizView),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let quiz = load_quiz(state.pool(), user, quiz_id).await?;
    let questions = load_questions(state.pool(), user, quiz_id).await?;

    Ok((StatusCode::OK, Json(QuizView::new(&quiz, &questions))))
}

#[utoipa::path(
    post,
    path = "/api/v1/quiz/{quiz_id}/submit",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    request_body = SubmitBody,
    description = "Grades an attempt, records it and completes the module on a pass",
    responses(
        (status = 200, description = "Graded attempt", body = SubmitResponse),
        (status = 400, description = "Quiz has no questions", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let quiz = load_quiz(state.pool(), user, quiz_id).await?;
    let questions = load_questions(state.pool(), user, quiz_id).await?;
    if questions.is_empty() {
        return Err(WebError::resource_bad_request(
            Quiz::get_resource_type(),
            "quiz has no questions",
        ));
    }

    let keys: Vec<AnswerKey> = questions.iter().map(QuizQuestion::answer_key).collect();
    let graded = grade(&keys, &payload.answers, quiz.passing_score());

    let result = QuizResult::record(
        state.pool(),
        user,
        &quiz,
        &graded,
        payload.time_taken_seconds,
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;

    debug!(
        quiz = %quiz_id,
        user = %user.user_id(),
        score = graded.score,
        passed = graded.passed,
        "quiz attempt recorded"
    );

    Ok((
        StatusCode::OK,
        Json(SubmitResponse::new(
            result.id(),
            quiz.passing_score(),
            graded,
            &questions,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/quiz/{quiz_id}/best-score",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Caller's best score and attempt count", body = BestScore),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_best_score_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    load_quiz(state.pool(), user, quiz_id).await?;

    let best = BestScore::fetch(state.pool(), user, quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(best)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quiz/{quiz_id}/statistics",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Aggregates over every user's attempts", body = QuizStatistics),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_statistics_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    load_quiz(state.pool(), user, quiz_id).await?;

    let stats = QuizStatistics::fetch(state.pool(), quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quiz/{quiz_id}/results",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Caller's attempts, newest first", body = Vec<QuizResult>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_results_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    load_quiz(state.pool(), user, quiz_id).await?;

    let history = QuizResult::history(state.pool(), user, quiz_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizResult::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(history)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quiz",
    request_body = QuizCreate,
    responses(
        (status = 201, description = "Quiz created", body = Quiz),
        (status = 400, description = "Invalid passing score or module outside the course", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;

    if payload.title.trim().is_empty() {
        return Err(WebError::invalid_field("title", "must not be empty"));
    }
    if payload.passing_score.is_some_and(|s| !(0..=100).contains(&s)) {
        return Err(WebError::invalid_field(
            "passing_score",
            "must be between 0 and 100",
        ));
    }

    Course::find_by_id(state.pool(), admin, payload.course_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    if let Some(module_id) = payload.module_id {
        let module = Module::find_by_id(state.pool(), admin, module_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
            .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;
        if module.course_id() != payload.course_id {
            return Err(WebError::invalid_field(
                "module_id",
                "module is not part of the course",
            ));
        }
    }

    let quiz = Quiz::create(state.pool(), admin, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Quiz::get_resource_type(), e))?;

    info!(quiz = %quiz.id(), "quiz created");
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quiz/{quiz_id}/questions",
    params(("quiz_id" = Uuid, Path, description = "Quiz id")),
    request_body = QuestionBody,
    responses(
        (status = 201, description = "Question added", body = QuizQuestion),
        (status = 400, description = "Correct answer outside the options", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "quiz",
    security(("bearer" = []), ("cookie" = []))
)]
async fn quiz_question_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<QuestionBody>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;
    let quiz = load_quiz(state.pool(), admin, quiz_id).await?;

    let data = QuizQuestionCreate {
        quiz_id: quiz.id(),
        question: payload.question,
        options: payload.options,
        correct_answer: payload.correct_answer,
        explanation: payload.explanation,
        question_order: payload.question_order,
    };

    if data.question.trim().is_empty() {
        return Err(WebError::invalid_field("question", "must not be empty"));
    }
    if data.options.len() < 2 {
        return Err(WebError::invalid_field(
            "options",
            "at least two options are required",
        ));
    }
    if !data.answer_in_range() {
        return Err(WebError::invalid_field(
            "correct_answer",
            "must index one of the options",
        ));
    }

    let question = QuizQuestion::create(state.pool(), admin, data)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizQuestion::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(question)))
}
