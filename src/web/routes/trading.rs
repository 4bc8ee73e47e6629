use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::ledger,
    market::{MarketError, normalize_symbol},
    model::{
        Page, ResourceTyped, check_access,
        entity::{OrderRequest, Portfolio, Position, Trade},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::trading::{OrderBody, OrderResponse, PortfolioView, PositionView, TradesQuery},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/portfolio", get(trading_portfolio_handler))
        .route("/portfolio/reset", post(trading_reset_handler))
        .route("/positions", get(trading_positions_handler))
        .route("/orders", post(trading_order_handler))
        .route("/trades", get(trading_trades_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn open_portfolio(state: &AppState, user: &AuthenticatedUser) -> WebResult<Portfolio> {
    let portfolio = Portfolio::get_or_create(
        state.pool(),
        user,
        state.config().trading().initial_balance(),
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Portfolio::get_resource_type(), e))?;

    check_access(state.pool(), user, &portfolio, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Portfolio::get_resource_type(), e))?;

    Ok(portfolio)
}

/// Positions marked to the latest quotes. A failed quote keeps the stored price.
async fn marked_positions(state: &AppState, portfolio_id: Uuid) -> WebResult<Vec<Position>> {
    let positions = Position::all_by_portfolio(state.pool(), portfolio_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Position::get_resource_type(), e))?;

    let mut marked = Vec::with_capacity(positions.len());
    for position in positions {
        match state.market().quote(position.symbol()).await {
            Ok(quote) => {
                let position = position
                    .mark(state.pool(), quote.price)
                    .await
                    .map_err(|e| WebError::resource_fetch_error(Position::get_resource_type(), e))?;
                marked.push(position);
            }
            Err(e) => {
                warn!(symbol = %position.symbol(), "keeping stored price: {e}");
                marked.push(position);
            }
        }
    }
    Ok(marked)
}

#[utoipa::path(
    get,
    path = "/api/v1/trading/portfolio",
    description = "Returns the caller's portfolio, opening it on first access",
    responses(
        (status = 200, description = "Portfolio valued at the latest quotes", body = PortfolioView),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "trading",
    security(("bearer" = []), ("cookie" = []))
)]
async fn trading_portfolio_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let portfolio = open_portfolio(&state, user).await?;
    let positions = marked_positions(&state, portfolio.id()).await?;
    let realized = Trade::realized_total(state.pool(), portfolio.id())
        .await
        .map_err(|e| WebError::resource_fetch_error(Trade::get_resource_type(), e))?;

    let valuation = ledger::value_portfolio(
        portfolio.cash_balance(),
        portfolio.initial_balance(),
        positions.iter().map(|p| (p.holding(), p.current_price())),
    );

    Ok((
        StatusCode::OK,
        Json(PortfolioView::new(&portfolio, &positions, valuation, realized)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/trading/positions",
    responses(
        (status = 200, description = "Open positions marked to the latest quotes", body = Vec<PositionView>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "trading",
    security(("bearer" = []), ("cookie" = []))
)]
async fn trading_positions_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let portfolio = open_portfolio(&state, user).await?;
    let positions = marked_positions(&state, portfolio.id()).await?;

    let views: Vec<PositionView> = positions.iter().map(PositionView::from).collect();
    Ok((StatusCode::OK, Json(views)))
}

/// Latest quote, or an explicit price near it. Without a quote the explicit
/// price fills as is.
async fn order_price(
    state: &AppState,
    symbol: &str,
    explicit: Option<Decimal>,
) -> WebResult<Decimal> {
    let quote = state.market().quote(symbol).await;

    match (quote, explicit) {
        (Ok(quote), None) => Ok(quote.price.round_dp(ledger::PRICE_SCALE)),
        (Ok(quote), Some(price)) => {
            ledger::check_price_near_quote(
                price,
                quote.price,
                state.config().trading().price_tolerance_percent(),
            )
            .map_err(|e| WebError::resource_fetch_error(Trade::get_resource_type(), e.into()))?;
            Ok(price)
        }
        (Err(e), Some(price)) if !matches!(e, MarketError::InvalidSymbol(_)) => {
            info!(%symbol, %price, "no quote available, filling at the given price: {e}");
            Ok(price)
        }
        (Err(e), _) => Err(WebError::market_error(e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/trading/orders",
    request_body = OrderBody,
    description = "Fills a market order at the latest quote. An explicit `price` must lie within `trading.price_tolerance_percent` of the quote and is used as is only when no quote is available",
    responses(
        (status = 200, description = "Order filled", body = OrderResponse),
        (status = 400, description = "Insufficient funds or shares, a price off the quote, or a quantity or price outside the stored range", body = ErrorResponse),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "Unknown symbol", body = ErrorResponse),
        (status = 502, description = "Market data provider failed", body = ErrorResponse),
    ),
    tag = "trading",
    security(("bearer" = []), ("cookie" = []))
)]
async fn trading_order_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<OrderBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let symbol = normalize_symbol(&payload.symbol).map_err(WebError::market_error)?;

    let price = order_price(&state, &symbol, payload.price).await?;

    let execution = Portfolio::execute_order(
        state.pool(),
        user,
        state.config().trading().initial_balance(),
        OrderRequest {
            symbol,
            side: payload.side,
            quantity: payload.quantity,
            price,
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(Trade::get_resource_type(), e))?;

    Ok((
        StatusCode::OK,
        Json(OrderResponse {
            position: execution.position.as_ref().map(PositionView::from),
            cash_balance: execution.portfolio.cash_balance().normalize(),
            trade: execution.trade,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/trading/trades",
    params(TradesQuery),
    responses(
        (status = 200, description = "Caller's trades, newest first", body = Page<Trade>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "trading",
    security(("bearer" = []), ("cookie" = []))
)]
async fn trading_trades_handler(
    ctx: RequestContext,
    Query(page): Query<TradesQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let (limit, offset) = Page::<Trade>::bounds(page.limit, page.offset);

    let portfolio = open_portfolio(&state, user).await?;
    let trades = Trade::page_by_portfolio(state.pool(), portfolio.id(), limit, offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Trade::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(trades)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trading/portfolio/reset",
    description = "Closes every position, drops the trade history and restores the starting cash",
    responses(
        (status = 200, description = "Portfolio reset", body = PortfolioView),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "trading",
    security(("bearer" = []), ("cookie" = []))
)]
async fn trading_reset_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let portfolio = open_portfolio(&state, user)
        .await?
        .reset(state.pool())
        .await
        .map_err(|e| WebError::resource_fetch_error(Portfolio::get_resource_type(), e))?;

    info!(portfolio = %portfolio.id(), "portfolio reset");

    let valuation = ledger::value_portfolio(
        portfolio.cash_balance(),
        portfolio.initial_balance(),
        std::iter::empty(),
    );
    Ok((
        StatusCode::OK,
        Json(PortfolioView::new(&portfolio, &[], valuation, Decimal::ZERO)),
    ))
}
