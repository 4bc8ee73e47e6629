use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};

use crate::{
    market::{Candle, HistoryRange, Interval, Quote, SymbolMatch, normalize_symbol},
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::market::{HistoryQuery, SearchQuery},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/quote/{symbol}", get(market_quote_handler))
        .route("/history/{symbol}", get(market_history_handler))
        .route("/search", get(market_search_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn parse_history_params(query: &HistoryQuery) -> WebResult<(HistoryRange, Interval)> {
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse().map_err(WebError::market_error)?,
        None => HistoryRange::default(),
    };
    let interval = match query.interval.as_deref() {
        Some(raw) => raw.parse().map_err(WebError::market_error)?,
        None => Interval::default(),
    };
    Ok((range, interval))
}

#[utoipa::path(
    get,
    path = "/api/v1/market/quote/{symbol}",
    params(("symbol" = String, Path, description = "Ticker, case-insensitive")),
    responses(
        (status = 200, description = "Latest quote", body = Quote),
        (status = 400, description = "Malformed symbol", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Unknown symbol", body = ErrorResponse),
        (status = 502, description = "Market data provider failed", body = ErrorResponse),
    ),
    tag = "market",
    security(("bearer" = []), ("cookie" = []))
)]
async fn market_quote_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;
    let symbol = normalize_symbol(&symbol).map_err(WebError::market_error)?;

    let quote = state
        .market()
        .quote(&symbol)
        .await
        .map_err(WebError::market_error)?;

    Ok((StatusCode::OK, Json(quote)))
}

#[utoipa::path(
    get,
    path = "/api/v1/market/history/{symbol}",
    params(
        ("symbol" = String, Path, description = "Ticker, case-insensitive"),
        HistoryQuery,
    ),
    description = "Price candles, oldest first. Defaults to one month of daily candles",
    responses(
        (status = 200, description = "Price series", body = Vec<Candle>),
        (status = 400, description = "Malformed symbol, range or interval", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Unknown symbol", body = ErrorResponse),
        (status = 502, description = "Market data provider failed", body = ErrorResponse),
    ),
    tag = "market",
    security(("bearer" = []), ("cookie" = []))
)]
async fn market_history_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;
    let symbol = normalize_symbol(&symbol).map_err(WebError::market_error)?;
    let (range, interval) = parse_history_params(&query)?;

    let candles = state
        .market()
        .history(&symbol, range, interval)
        .await
        .map_err(WebError::market_error)?;

    Ok((StatusCode::OK, Json(candles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/market/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching symbols, empty for an empty query", body = Vec<SymbolMatch>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 502, description = "Market data provider failed", body = ErrorResponse),
    ),
    tag = "market",
    security(("bearer" = []), ("cookie" = []))
)]
async fn market_search_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> WebResult<impl IntoResponse> {
    ctx.user()?;

    let q = query.q.trim();
    if q.is_empty() {
        return Ok((StatusCode::OK, Json(Vec::<SymbolMatch>::new())));
    }

    let matches = state
        .market()
        .search(q)
        .await
        .map_err(WebError::market_error)?;

    Ok((StatusCode::OK, Json(matches)))
}
