use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::info;

use crate::{
    cache::{CacheError, MAX_TTL},
    model::ResourceType,
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::cache::{CacheDeleteResponse, CacheEntryView, CacheSetBody, CacheSetResponse},
        error::ErrorResponse,
        middlewares,
    },
};

const MAX_KEY_LEN: usize = 256;

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", delete(cache_flush_handler))
        .route(
            "/{key}",
            get(cache_get_handler)
                .post(cache_set_handler)
                .delete(cache_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Keys written through this API live under their own prefix, apart from
/// the entries the market-data layer keeps.
fn scoped_key(key: &str) -> WebResult<String> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(WebError::invalid_field(
            "key",
            format!("must be 1 to {MAX_KEY_LEN} bytes"),
        ));
    }
    Ok(format!("api:{key}"))
}

fn cache_error(e: CacheError) -> WebError {
    match e {
        CacheError::InvalidTtl => WebError::invalid_field("ttl", e.to_string()),
        e => WebError::server_cache_error(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/cache/{key}",
    params(("key" = String, Path, description = "Cache key")),
    responses(
        (status = 200, description = "Stored value", body = CacheEntryView),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Key missing or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "cache",
    security(("bearer" = []), ("cookie" = []))
)]
async fn cache_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;
    let scoped = scoped_key(&key)?;

    let value = state
        .cache()
        .get(&scoped)
        .await
        .map_err(cache_error)?
        .ok_or_else(|| WebError::resource_not_found(ResourceType::CacheEntry))?;

    Ok((StatusCode::OK, Json(CacheEntryView { key, value })))
}

#[utoipa::path(
    post,
    path = "/api/cache/{key}",
    params(("key" = String, Path, description = "Cache key")),
    request_body = CacheSetBody,
    responses(
        (status = 200, description = "Value stored", body = CacheSetResponse),
        (status = 400, description = "TTL outside one second to thirty days", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "cache",
    security(("bearer" = []), ("cookie" = []))
)]
async fn cache_set_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<CacheSetBody>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;
    let scoped = scoped_key(&key)?;

    let ttl = match payload.ttl {
        Some(secs) if secs == 0 || secs > MAX_TTL.as_secs() => {
            return Err(WebError::invalid_field(
                "ttl",
                format!("must be 1 to {} seconds", MAX_TTL.as_secs()),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
        None => state.config().cache().default_ttl(),
    };

    state
        .cache()
        .set_ex(&scoped, &payload.value, ttl)
        .await
        .map_err(cache_error)?;

    Ok((
        StatusCode::OK,
        Json(CacheSetResponse {
            key,
            ttl: ttl.as_secs(),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cache/{key}",
    params(("key" = String, Path, description = "Cache key")),
    responses(
        (status = 200, description = "Whether the key existed", body = CacheDeleteResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "cache",
    security(("bearer" = []), ("cookie" = []))
)]
async fn cache_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;
    let scoped = scoped_key(&key)?;

    let deleted = state
        .cache()
        .del(&scoped)
        .await
        .map_err(cache_error)?;

    Ok((StatusCode::OK, Json(CacheDeleteResponse { deleted })))
}

#[utoipa::path(
    delete,
    path = "/api/cache",
    description = "Drops every cache entry, market data included",
    responses(
        (status = 200, description = "Cache flushed"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "cache",
    security(("bearer" = []), ("cookie" = []))
)]
async fn cache_flush_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let admin = ctx.admin_user()?;

    state
        .cache()
        .flush_all()
        .await
        .map_err(cache_error)?;

    info!(by = %admin.user_id(), "cache flushed");
    Ok(StatusCode::OK)
}
