use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::ledger::{Side, Valuation},
    model::entity::{Portfolio, Position, Trade},
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct OrderBody {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    /// Fill price; the latest quote is used when absent.
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// Percent against cost basis.
    pub unrealized_pnl_percent: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<&Position> for PositionView {
    fn from(p: &Position) -> Self {
        let holding = p.holding();
        let cost_basis = holding.cost_basis();
        let unrealized = holding.unrealized_pnl(p.current_price());
        let percent = if cost_basis.is_zero() {
            Decimal::ZERO
        } else {
            (unrealized / cost_basis * Decimal::ONE_HUNDRED).round_dp(2)
        };

        Self {
            symbol: p.symbol().to_string(),
            quantity: p.quantity().normalize(),
            average_cost: p.average_cost().normalize(),
            current_price: p.current_price().normalize(),
            cost_basis: cost_basis.round_dp(4).normalize(),
            market_value: holding.market_value(p.current_price()).round_dp(4).normalize(),
            unrealized_pnl: unrealized.round_dp(4).normalize(),
            unrealized_pnl_percent: percent.normalize(),
            updated_at: *p.updated_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PortfolioView {
    pub id: Uuid,
    pub cash_balance: Decimal,
    pub initial_balance: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub total_value: Decimal,
    /// Percent change of `total_value` against `initial_balance`.
    pub total_return: Decimal,
    pub positions: Vec<PositionView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PortfolioView {
    pub fn new(
        portfolio: &Portfolio,
        positions: &[Position],
        valuation: Valuation,
        realized_pnl: Decimal,
    ) -> Self {
        Self {
            id: portfolio.id(),
            cash_balance: portfolio.cash_balance().normalize(),
            initial_balance: portfolio.initial_balance().normalize(),
            market_value: valuation.market_value.round_dp(4).normalize(),
            cost_basis: valuation.cost_basis.round_dp(4).normalize(),
            unrealized_pnl: valuation.unrealized_pnl.round_dp(4).normalize(),
            realized_pnl: realized_pnl.normalize(),
            total_value: valuation.total_value.round_dp(4).normalize(),
            total_return: valuation.total_return.normalize(),
            positions: positions.iter().map(PositionView::from).collect(),
            created_at: *portfolio.created_at(),
            updated_at: *portfolio.updated_at(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub trade: Trade,
    /// `null` when the order closed the position.
    pub position: Option<PositionView>,
    pub cash_balance: Decimal,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TradesQuery {
    #[serde(default = "default_trades_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_trades_limit() -> i64 {
    50
}
