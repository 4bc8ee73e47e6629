use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::debug;

use crate::{
    market::normalize_symbol,
    model::{ResourceTyped, entity::WatchlistItem},
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::market::{WatchlistBody, WatchlistEntry},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(watchlist_list_handler).post(watchlist_add_handler))
        .route("/{symbol}", delete(watchlist_remove_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/watchlist",
    description = "Watched symbols with their latest quotes",
    responses(
        (status = 200, description = "Watched symbols, quote is null when unavailable", body = Vec<WatchlistEntry>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "watchlist",
    security(("bearer" = []), ("cookie" = []))
)]
async fn watchlist_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let items = WatchlistItem::all_for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(WatchlistItem::get_resource_type(), e))?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let quote = match state.market().quote(item.symbol()).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                debug!(symbol = %item.symbol(), "no quote for watched symbol: {e}");
                None
            }
        };
        entries.push(WatchlistEntry {
            symbol: item.symbol().to_string(),
            added_at: *item.added_at(),
            quote,
        });
    }

    Ok((StatusCode::OK, Json(entries)))
}

#[utoipa::path(
    post,
    path = "/api/v1/watchlist",
    request_body = WatchlistBody,
    responses(
        (status = 201, description = "Symbol added", body = WatchlistItem),
        (status = 400, description = "Malformed symbol", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 409, description = "Symbol already watched", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "watchlist",
    security(("bearer" = []), ("cookie" = []))
)]
async fn watchlist_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<WatchlistBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let symbol = normalize_symbol(&payload.symbol).map_err(WebError::market_error)?;

    let item = WatchlistItem::add(state.pool(), user, &symbol)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                WebError::resource_conflict(WatchlistItem::get_resource_type())
            } else {
                WebError::resource_fetch_error(WatchlistItem::get_resource_type(), e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/watchlist/{symbol}",
    params(("symbol" = String, Path, description = "Ticker, case-insensitive")),
    responses(
        (status = 200, description = "Symbol removed"),
        (status = 400, description = "Malformed symbol", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Symbol not watched", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "watchlist",
    security(("bearer" = []), ("cookie" = []))
)]
async fn watchlist_remove_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let symbol = normalize_symbol(&symbol).map_err(WebError::market_error)?;

    let removed = WatchlistItem::remove(state.pool(), user, &symbol)
        .await
        .map_err(|e| WebError::resource_fetch_error(WatchlistItem::get_resource_type(), e))?;

    if !removed {
        return Err(WebError::resource_not_found(
            WatchlistItem::get_resource_type(),
        ));
    }
    Ok(StatusCode::OK)
}
