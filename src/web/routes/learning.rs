use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{
            Course, CourseCreate, CourseWithProgressRow, Module, ModuleCreate,
            ModuleWithProgressRow, ProgressSummary, UserProgress, UserProgressUpsert,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::learning::{
            CourseDetail, CourseOverview, ModuleBody, ModuleProgressView, ProgressBody,
            ProgressOverview,
        },
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/courses",
            get(learning_courses_handler).post(learning_course_create_handler),
        )
        .route(
            "/courses/{id}",
            get(learning_course_handler)
                .put(learning_course_update_handler)
                .delete(learning_course_delete_handler),
        )
        .route("/courses/{id}/modules", post(learning_module_create_handler))
        .route(
            "/progress",
            get(learning_progress_handler).post(learning_progress_update_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn check_course(payload: &CourseCreate) -> WebResult<()> {
    if payload.title.trim().is_empty() {
        return Err(WebError::invalid_field("title", "must not be empty"));
    }
    if payload.credits < 0 {
        return Err(WebError::invalid_field("credits", "must not be negative"));
    }
    Ok(())
}

fn check_score(score: Option<i32>) -> WebResult<()> {
    match score {
        Some(s) if !(0..=100).contains(&s) => {
            Err(WebError::invalid_field("score", "must be between 0 and 100"))
        }
        _ => Ok(()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/learning/courses",
    description = "Lists every course with the caller's module completion",
    responses(
        (status = 200, description = "Courses ordered by order_index", body = Vec<CourseOverview>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_courses_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let rows = CourseWithProgressRow::fetch_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    let courses: Vec<CourseOverview> = rows.into_iter().map(CourseOverview::from).collect();
    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    get,
    path = "/api/v1/learning/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course with its ordered modules", body = CourseDetail),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_course_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let course = Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    let modules = ModuleWithProgressRow::fetch_by_course(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(CourseDetail {
            course,
            modules: modules.into_iter().map(ModuleProgressView::from).collect(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/learning/courses",
    request_body = CourseCreate,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Empty title or negative credits", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_course_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;
    check_course(&payload)?;

    let course = Course::create(state.pool(), admin, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    info!(course = %course.id(), "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/v1/learning/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Empty title or negative credits", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;
    check_course(&payload)?;

    let found = Course::find_by_id(state.pool(), admin, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    let updated = found
        .update(state.pool(), admin, payload)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/learning/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Deletes a course together with its modules, quizzes and progress",
    responses(
        (status = 200, description = "Course deleted"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_course_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;

    let found = Course::find_by_id(state.pool(), admin, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    found
        .delete(state.pool(), admin)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    info!(course = %id, "course deleted");
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/learning/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = ModuleBody,
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 400, description = "Empty title", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_module_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleBody>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;
    if payload.title.trim().is_empty() {
        return Err(WebError::invalid_field("title", "must not be empty"));
    }

    let course = Course::find_by_id(state.pool(), admin, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Course::get_resource_type()))?;

    let data = ModuleCreate {
        course_id: course.id(),
        title: payload.title,
        content: payload.content,
        module_order: payload.module_order,
        duration_minutes: payload.duration_minutes,
    };

    // the course may vanish between the lookup and the insert
    let module = Module::create(state.pool(), admin, data)
        .await
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                WebError::resource_not_found(Course::get_resource_type())
            } else {
                WebError::resource_fetch_error(Module::get_resource_type(), e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(module)))
}

#[utoipa::path(
    get,
    path = "/api/v1/learning/progress",
    description = "Returns the caller's module progress and credit totals",
    responses(
        (status = 200, description = "Progress rows and summary", body = ProgressOverview),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let progress = UserProgress::all_for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;
    let summary = ProgressSummary::fetch(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(ProgressOverview { progress, summary })))
}

#[utoipa::path(
    post,
    path = "/api/v1/learning/progress",
    request_body = ProgressBody,
    description = "Records the caller's completion of a module",
    responses(
        (status = 200, description = "Progress stored", body = UserProgress),
        (status = 400, description = "Module is not part of the course or score out of range", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "learning",
    security(("bearer" = []), ("cookie" = []))
)]
async fn learning_progress_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ProgressBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    check_score(payload.score)?;

    let module = Module::find_by_id(state.pool(), user, payload.module_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Module::get_resource_type()))?;

    if module.course_id() != payload.course_id {
        return Err(WebError::invalid_field(
            "module_id",
            "module is not part of the course",
        ));
    }

    let progress = UserProgress::upsert(
        state.pool(),
        user,
        UserProgressUpsert {
            course_id: payload.course_id,
            module_id: payload.module_id,
            completed: payload.completed,
            score: payload.score,
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(progress)))
}
